//! The broker engine: the route registry, the per-route queues and the
//! listener task that fans queued messages out to consumers.
//!
//! Public types:
//! - `RouteRegistry`: route name → queue, with idempotent creation.
//! - `Queue`: pending messages plus registered consumers for one route.
//! - `QueueStats`: a snapshot of a queue for logging.

pub(crate) mod listener;
pub mod pending;
pub mod queue;
pub mod registry;

pub use queue::{Queue, QueueStats};
pub use registry::RouteRegistry;

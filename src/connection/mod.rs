//! The `connection` module represents the broker's side of a client socket.
//!
//! It provides [`ConnectionWriter`], the handle onto a socket's writer task shared by
//! every route a socket consumes from, and [`ConnectionRecord`], the entry a
//! queue stores for each registered consumer.

pub mod record;
pub mod writer;

pub use record::{ConnectionId, ConnectionRecord};
pub use writer::ConnectionWriter;

//! # RouteMQ
//!
//! `routemq` is a minimal, in-memory message broker built with Rust. Clients
//! connect over TCP, declare named queues ("routes"), publish messages onto
//! a route and register as consumers to receive fan-out delivery of queued
//! messages.
//!
//! ## Core Modules
//!
//! - `protocol`: length-prefixed framing and the JSON message types.
//! - `broker`: the route registry, per-route queues and their delivery tasks.
//! - `connection`: the broker's side of a client socket.
//! - `transport`: the TCP listener and per-connection handler.
//! - `client`: a small client for the same protocol.
//! - `config`: loading server and broker configuration.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod transport;
pub mod utils;

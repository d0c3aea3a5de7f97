//! The `transport` module is responsible for handling network communication
//! with clients over TCP.
//!
//! It accepts sockets, runs one [`ConnectionHandler`] per socket, and turns
//! framed protocol messages into registry and queue operations.

pub mod handler;
pub mod tcp;

pub use handler::{ConnectionHandler, handle_connection};
pub use tcp::{serve, start_tcp_server};

//! The `protocol` module defines the wire format spoken between clients and
//! the broker: length-prefixed frames carrying JSON messages.
//!
//! - `frame`: reading and writing `[u32 LE length][payload]` frames.
//! - `message`: the typed messages and their JSON shape.
//! - `parser`: turning a payload into a typed message.

pub mod frame;
pub mod message;
pub mod parser;

pub use frame::{FrameReader, encode_frame, write_frame};
pub use message::{
    ClientMessage, ConsumerRegistration, Envelope, ErrorReply, QueueDescriptor, ServerMessage,
};
pub use parser::{parse, parse_server};

#[cfg(test)]
mod tests;

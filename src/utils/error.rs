//! The `error` module defines the error types used within `routemq`.
//!
//! Errors are grouped by the layer that raises them so each one stays local
//! to where it can be handled:
//!
//! - [`FrameError`]: the length-prefixed codec. Fatal to one connection only.
//! - [`ParseError`]: a single payload could not be turned into a message.
//!   The connection keeps going.
//! - [`BrokerError`]: registry/queue operations rejected for the caller.
//! - [`DeliveryError`]: a write to a consumer socket failed.
//! - [`ClientError`]: everything the client library can hit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    /// End of stream, either between frames or in the middle of one.
    #[error("connection closed")]
    Closed,

    #[error("frame length {len} exceeds maximum of {max} bytes")]
    TooLarge { len: usize, max: usize },

    #[error("payload of {0} bytes does not fit a 32-bit length prefix")]
    Oversized(usize),

    #[error("frame i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown message type {message_type:?}")]
    UnknownType {
        message_type: Option<String>,
        record: serde_json::Value,
    },

    /// `message_type` is `None` when the payload was not a JSON object at all.
    #[error("malformed {} message: {source}", .message_type.as_deref().unwrap_or("JSON"))]
    MalformedBody {
        message_type: Option<String>,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error(
        "route '{0}' does not exist, declare it with a Queue message before publishing or consuming"
    )]
    RouteNotFound(String),

    #[error(
        "route '{route}' already declared as Type={existing_kind:?} Durable={existing_durable}, \
         refusing Type={requested_kind:?} Durable={requested_durable}"
    )]
    DeclarationMismatch {
        route: String,
        existing_kind: String,
        existing_durable: bool,
        requested_kind: String,
        requested_durable: bool,
    },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("consumer connection is closed")]
    ConnectionClosed,

    #[error("failed to write to consumer: {0}")]
    Other(std::io::Error),

    #[error("failed to encode delivery: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! Consumer connection record
//!
//! `ConnectionRecord` is what a queue keeps per registered consumer. The
//! `id` is a fresh UUID per registration, so the same socket registered on
//! two routes has two ids, and a consumer that reconnects is a new consumer.

use uuid::Uuid;

use super::writer::ConnectionWriter;

pub type ConnectionId = String;

#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub writer: ConnectionWriter,
    /// Copied onto every envelope delivered to this consumer.
    pub stream_id: Option<String>,
}

impl ConnectionRecord {
    pub fn new(writer: ConnectionWriter, stream_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            writer,
            stream_id,
        }
    }
}

//! Wire message definitions.
//!
//! Every frame body is a JSON object whose `MessageType` field says which
//! shape follows. Field names match what existing clients send, hence the
//! PascalCase renames.
//!
//! `Body` fields carry opaque bytes and travel as standard base64 strings,
//! which is how the clients' JSON encoders represent raw byte slices.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const QUEUE_TYPE: &str = "Queue";
pub const PUBLISH_TYPE: &str = "EPMessage";
pub const CONSUMER_TYPE: &str = "Consumer";
pub const ERROR_TYPE: &str = "Error";

/// Declaration of a queue for a route. Sending one also registers the
/// sender as a consumer of that route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    #[serde(rename = "Name")]
    pub name: String,
    /// Opaque label (point-to-point, broadcast, ...). Stored, not interpreted.
    #[serde(rename = "Type", default)]
    pub kind: String,
    /// Accepted and stored; queues are never written to disk.
    #[serde(rename = "Durable", default)]
    pub durable: bool,
}

/// A published message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Route")]
    pub route: String,
    #[serde(rename = "Body", with = "body", default)]
    pub body: Bytes,
    /// Set per delivery from the consumer's registration; ignored on publish.
    #[serde(rename = "StreamID", default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

impl Envelope {
    pub fn new(route: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            route: route.into(),
            body: body.into(),
            stream_id: None,
        }
    }
}

/// Request to receive deliveries for an existing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerRegistration {
    #[serde(rename = "Route")]
    pub route: String,
    #[serde(rename = "StreamID", default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

/// Error report written back to a peer whose request failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(rename = "Body", with = "body", default)]
    pub body: Bytes,
}

impl ErrorReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(message.into()),
        }
    }

    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Messages a client sends to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "MessageType")]
pub enum ClientMessage {
    #[serde(rename = "Queue")]
    Queue(QueueDescriptor),
    #[serde(rename = "EPMessage")]
    Publish(Envelope),
    #[serde(rename = "Consumer")]
    Consumer(ConsumerRegistration),
}

/// Messages the broker sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "MessageType")]
pub enum ServerMessage {
    #[serde(rename = "EPMessage")]
    Delivery(Envelope),
    #[serde(rename = "Error")]
    Error(ErrorReply),
}

/// serde adapter for `Bytes` as a base64 string.
mod body {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            None => Ok(Bytes::new()),
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Bytes::from)
                .map_err(serde::de::Error::custom),
        }
    }
}

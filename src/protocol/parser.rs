//! Payload → typed message translation. No I/O happens here.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::message::{
    CONSUMER_TYPE, ClientMessage, ERROR_TYPE, PUBLISH_TYPE, QUEUE_TYPE, ServerMessage,
};
use crate::utils::error::ParseError;

const DISCRIMINANT: &str = "MessageType";

/// Decode a frame payload sent by a client.
pub fn parse(payload: &[u8]) -> Result<ClientMessage, ParseError> {
    let (message_type, record) = discriminate(payload)?;
    match message_type.as_deref() {
        Some(QUEUE_TYPE) => shape(QUEUE_TYPE, record).map(ClientMessage::Queue),
        Some(PUBLISH_TYPE) => shape(PUBLISH_TYPE, record).map(ClientMessage::Publish),
        Some(CONSUMER_TYPE) => shape(CONSUMER_TYPE, record).map(ClientMessage::Consumer),
        _ => Err(ParseError::UnknownType {
            message_type,
            record,
        }),
    }
}

/// Decode a frame payload sent by the broker.
pub fn parse_server(payload: &[u8]) -> Result<ServerMessage, ParseError> {
    let (message_type, record) = discriminate(payload)?;
    match message_type.as_deref() {
        Some(PUBLISH_TYPE) => shape(PUBLISH_TYPE, record).map(ServerMessage::Delivery),
        Some(ERROR_TYPE) => shape(ERROR_TYPE, record).map(ServerMessage::Error),
        _ => Err(ParseError::UnknownType {
            message_type,
            record,
        }),
    }
}

fn discriminate(payload: &[u8]) -> Result<(Option<String>, Value), ParseError> {
    let record: Value =
        serde_json::from_slice(payload).map_err(|source| ParseError::MalformedBody {
            message_type: None,
            source,
        })?;
    let message_type = record
        .get(DISCRIMINANT)
        .and_then(Value::as_str)
        .map(str::to_owned);
    Ok((message_type, record))
}

fn shape<T: DeserializeOwned>(message_type: &str, record: Value) -> Result<T, ParseError> {
    serde_json::from_value(record).map_err(|source| ParseError::MalformedBody {
        message_type: Some(message_type.to_owned()),
        source,
    })
}

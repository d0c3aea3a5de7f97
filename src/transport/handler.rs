//! Connection handler
//!
//! One handler runs per accepted socket. It loops over
//! read frame → parse → dispatch until the codec reports the stream is
//! gone. A payload that fails to parse is logged and skipped, so one bad
//! frame does not cost the client its connection. Failed requests
//! (unknown route, conflicting declaration) are reported back to the peer
//! as `Error` frames.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::broker::{Queue, RouteRegistry};
use crate::config::BrokerSettings;
use crate::connection::{ConnectionId, ConnectionWriter};
use crate::protocol::{ClientMessage, ErrorReply, FrameReader, ServerMessage, parse};
use crate::utils::error::{BrokerError, FrameError, ParseError};

const PREVIEW_LEN: usize = 100;

/// Split `stream`, wrap its write half and run a handler to completion.
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    registry: Arc<RouteRegistry>,
    settings: BrokerSettings,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let writer = ConnectionWriter::new(writer, peer);
    ConnectionHandler::new(registry, writer, settings)
        .run(reader)
        .await;
}

pub struct ConnectionHandler {
    registry: Arc<RouteRegistry>,
    writer: ConnectionWriter,
    settings: BrokerSettings,
    /// route → the id this socket is registered under on that route
    registrations: HashMap<String, ConnectionId>,
}

impl ConnectionHandler {
    pub fn new(
        registry: Arc<RouteRegistry>,
        writer: ConnectionWriter,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            registry,
            writer,
            settings,
            registrations: HashMap::new(),
        }
    }

    pub async fn run<R>(mut self, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let peer = self.writer.peer().to_string();
        tracing::info!(%peer, "client connected");

        let mut frames = FrameReader::with_limits(
            reader,
            self.settings.read_chunk_size,
            self.settings.max_frame_len,
        );
        loop {
            match frames.next_frame().await {
                Ok(payload) => self.handle_payload(&payload).await,
                Err(FrameError::Closed) => {
                    tracing::info!(%peer, "client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "dropping connection");
                    break;
                }
            }
        }

        self.shutdown();
    }

    /// Parse and dispatch one payload. Never fails: problems are logged and,
    /// for rejected requests, reported to the peer.
    pub async fn handle_payload(&mut self, payload: &[u8]) {
        let message = match parse(payload) {
            Ok(message) => message,
            Err(ParseError::UnknownType {
                message_type,
                record,
            }) => {
                tracing::warn!(
                    peer = %self.writer.peer(),
                    message_type = ?message_type,
                    %record,
                    "unknown message type, expected Queue | EPMessage | Consumer"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    peer = %self.writer.peer(),
                    error = %e,
                    payload = %preview(payload),
                    "invalid client message"
                );
                return;
            }
        };

        if let Err(e) = self.dispatch(message) {
            tracing::warn!(peer = %self.writer.peer(), error = %e, "request rejected");
            if self.settings.reply_errors {
                self.reply_error(&e);
            }
        }
    }

    pub fn dispatch(&mut self, message: ClientMessage) -> Result<(), BrokerError> {
        match message {
            ClientMessage::Queue(descriptor) => {
                let queue = self.registry.get_or_create(&descriptor)?;
                if self.registration(&queue).is_none() {
                    self.register(&queue, None);
                }
            }
            ClientMessage::Consumer(registration) => {
                let queue = self.registry.lookup(&registration.route)?;
                match self.registration(&queue) {
                    // Already consuming (declare registers too): the latest
                    // StreamID wins.
                    Some(id) => {
                        queue.set_stream_id(&id, registration.stream_id);
                    }
                    None => self.register(&queue, registration.stream_id),
                }
            }
            ClientMessage::Publish(envelope) => {
                let queue = self.registry.lookup(&envelope.route)?;
                tracing::debug!(
                    peer = %self.writer.peer(),
                    route = %envelope.route,
                    bytes = envelope.body.len(),
                    "publish"
                );
                queue.publish(envelope);
            }
        }
        Ok(())
    }

    /// The id this socket is still registered under on `queue`, if any.
    fn registration(&self, queue: &Queue) -> Option<ConnectionId> {
        let id = self.registrations.get(queue.name())?;
        queue.consumer_ids().contains(id).then(|| id.clone())
    }

    fn register(&mut self, queue: &Queue, stream_id: Option<String>) {
        let id = queue.register_consumer(self.writer.clone(), stream_id);
        self.registrations.insert(queue.name().to_string(), id);
    }

    fn reply_error(&self, error: &BrokerError) {
        let reply = ServerMessage::Error(ErrorReply::new(error.to_string()));
        let payload = match serde_json::to_vec(&reply) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode error reply");
                return;
            }
        };
        if let Err(e) = self.writer.send(&payload) {
            tracing::debug!(peer = %self.writer.peer(), error = %e, "could not send error reply");
        }
    }

    /// Close the socket and take this connection out of every queue it
    /// consumed from. Messages still pending stay queued.
    fn shutdown(&mut self) {
        self.writer.close();
        for (route, id) in self.registrations.drain() {
            if let Ok(queue) = self.registry.lookup(&route) {
                queue.remove_consumer(&id);
            }
        }
    }
}

fn preview(payload: &[u8]) -> String {
    let end = payload.len().min(PREVIEW_LEN);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

//! Per-queue delivery task.
//!
//! One listener runs per queue for the life of the process. Every wake-up
//! it takes all pending messages and the current consumers, hands the whole
//! batch to each consumer's writer in FIFO order, and then drops the
//! consumers whose sockets turned out to be closed. Handing a frame over
//! only queues it on the connection's writer task, so a consumer that
//! stops reading never holds up the batch.

use std::collections::HashSet;
use std::sync::Arc;

use super::queue::Queue;
use crate::connection::{ConnectionId, ConnectionRecord};
use crate::protocol::{Envelope, ServerMessage};
use crate::utils::error::DeliveryError;

pub(crate) async fn run(queue: Arc<Queue>) {
    tracing::info!(route = %queue.name(), "listener started");
    loop {
        queue.notified().await;

        let Some((messages, consumers)) = queue.take_batch() else {
            tracing::trace!(route = %queue.name(), "nothing to deliver");
            continue;
        };

        tracing::debug!(
            route = %queue.name(),
            messages = messages.len(),
            consumers = consumers.len(),
            "delivering batch"
        );
        let dead = deliver_batch(queue.name(), &messages, &consumers);
        queue.remove_consumers(&dead);

        let stats = queue.stats();
        tracing::debug!(
            route = %stats.route,
            pending = stats.pending,
            consumers = stats.consumers,
            "batch delivered"
        );
    }
}

/// Deliver `messages` to every consumer and return the ids found dead.
pub(crate) fn deliver_batch(
    route: &str,
    messages: &[Envelope],
    consumers: &[ConnectionRecord],
) -> HashSet<ConnectionId> {
    consumers
        .iter()
        .filter_map(|consumer| deliver_to(route, consumer, messages))
        .collect()
}

fn deliver_to(
    route: &str,
    consumer: &ConnectionRecord,
    messages: &[Envelope],
) -> Option<ConnectionId> {
    for envelope in messages {
        match send_envelope(consumer, envelope) {
            Ok(()) => {}
            Err(DeliveryError::ConnectionClosed) => {
                tracing::warn!(
                    route,
                    connection_id = %consumer.id,
                    peer = %consumer.writer.peer(),
                    "consumer connection closed, dropping it"
                );
                return Some(consumer.id.clone());
            }
            // At-most-once: a failed attempt is not retried.
            Err(e) => {
                tracing::warn!(
                    route,
                    connection_id = %consumer.id,
                    error = %e,
                    "delivery failed"
                );
            }
        }
    }
    None
}

fn send_envelope(
    consumer: &ConnectionRecord,
    envelope: &Envelope,
) -> Result<(), DeliveryError> {
    let delivery = ServerMessage::Delivery(Envelope {
        stream_id: consumer.stream_id.clone(),
        ..envelope.clone()
    });
    let payload = serde_json::to_vec(&delivery)?;
    consumer.writer.send(&payload)
}

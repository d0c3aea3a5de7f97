//! Queue entity
//!
//! A `Queue` owns everything for one route: the messages waiting for
//! delivery, the registered consumers and the wake-up signal its listener
//! task sleeps on. All mutable state sits behind one mutex that is never
//! held across an `.await`; the listener copies what it needs out and
//! delivers without the lock.
//!
//! `consumers` and `order` always hold the same ids. `order` is the
//! registration order and drives fan-out, so deliveries go out in a
//! deterministic sequence.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::listener;
use super::pending::PendingQueue;
use crate::connection::{ConnectionId, ConnectionRecord, ConnectionWriter};
use crate::protocol::{Envelope, QueueDescriptor};

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub(crate) pending: PendingQueue<Envelope>,
    pub(crate) consumers: HashMap<ConnectionId, ConnectionRecord>,
    pub(crate) order: Vec<ConnectionId>,
}

impl QueueState {
    pub(crate) fn insert(&mut self, record: ConnectionRecord) {
        self.order.push(record.id.clone());
        self.consumers.insert(record.id.clone(), record);
    }

    /// Drop every id in `dead` from both the map and the order. The order
    /// is rebuilt by filtering so survivors keep their relative positions.
    pub(crate) fn remove(&mut self, dead: &HashSet<ConnectionId>) -> usize {
        let before = self.order.len();
        self.order = self
            .order
            .iter()
            .filter(|id| !dead.contains(*id))
            .cloned()
            .collect();
        self.consumers.retain(|id, _| !dead.contains(id));
        before - self.order.len()
    }

    /// Consumers in registration order.
    pub(crate) fn ordered_consumers(&self) -> Vec<ConnectionRecord> {
        self.order
            .iter()
            .filter_map(|id| self.consumers.get(id).cloned())
            .collect()
    }
}

/// Point-in-time view of a queue, for logs and introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub route: String,
    pub kind: String,
    pub durable: bool,
    pub pending: usize,
    pub consumers: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Queue {
    name: String,
    kind: String,
    durable: bool,
    created_at: DateTime<Utc>,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Queue {
    pub(crate) fn new(descriptor: &QueueDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            kind: descriptor.kind.clone(),
            durable: descriptor.durable,
            created_at: Utc::now(),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    /// Start the delivery task. The registry calls this once, right after
    /// inserting the queue.
    pub(crate) fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(listener::run(Arc::clone(self)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn durable(&self) -> bool {
        self.durable
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether a declaration asks for the same queue as this one.
    pub fn matches(&self, descriptor: &QueueDescriptor) -> bool {
        self.kind == descriptor.kind && self.durable == descriptor.durable
    }

    /// Add a consumer and wake the listener so held messages go out.
    pub fn register_consumer(
        &self,
        writer: ConnectionWriter,
        stream_id: Option<String>,
    ) -> ConnectionId {
        let record = ConnectionRecord::new(writer, stream_id);
        let id = record.id.clone();
        let consumers = {
            let mut state = self.state();
            state.insert(record);
            state.order.len()
        };
        tracing::info!(route = %self.name, connection_id = %id, consumers, "consumer registered");
        self.notify();
        id
    }

    /// Change the StreamID stamped on deliveries to consumer `id`. Returns
    /// whether the id was registered.
    pub fn set_stream_id(&self, id: &ConnectionId, stream_id: Option<String>) -> bool {
        let mut state = self.state();
        let Some(record) = state.consumers.get_mut(id) else {
            return false;
        };
        if record.stream_id != stream_id {
            tracing::debug!(
                route = %self.name,
                connection_id = %id,
                stream_id = ?stream_id,
                "consumer stream id updated"
            );
            record.stream_id = stream_id;
        }
        true
    }

    /// Returns whether the id was registered.
    pub fn remove_consumer(&self, id: &ConnectionId) -> bool {
        let dead = HashSet::from([id.clone()]);
        self.remove_consumers(&dead) > 0
    }

    pub(crate) fn remove_consumers(&self, dead: &HashSet<ConnectionId>) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let (removed, remaining) = {
            let mut state = self.state();
            let removed = state.remove(dead);
            (removed, state.order.len())
        };
        if removed > 0 {
            tracing::info!(route = %self.name, removed, remaining, "consumers removed");
        }
        removed
    }

    /// Queue an envelope for delivery and wake the listener.
    pub fn publish(&self, mut envelope: Envelope) {
        envelope.stream_id = None;
        let pending = {
            let mut state = self.state();
            state.pending.enqueue(envelope);
            state.pending.len()
        };
        tracing::debug!(route = %self.name, pending, "message queued");
        self.notify();
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.state().order.len()
    }

    /// Registered consumer ids in delivery order.
    pub fn consumer_ids(&self) -> Vec<ConnectionId> {
        self.state().order.clone()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state();
        QueueStats {
            route: self.name.clone(),
            kind: self.kind.clone(),
            durable: self.durable,
            pending: state.pending.len(),
            consumers: state.order.len(),
            created_at: self.created_at,
        }
    }

    /// Coalescing wake-up: at most one signal is stored while the listener
    /// is busy, and the listener re-reads state after every wake.
    pub(crate) fn notify(&self) {
        self.notify.notify_one();
    }

    pub(crate) async fn notified(&self) {
        self.notify.notified().await
    }

    /// Take the next batch if there is anything to deliver to anyone.
    /// Messages stay queued while there are no consumers.
    pub(crate) fn take_batch(&self) -> Option<(Vec<Envelope>, Vec<ConnectionRecord>)> {
        let mut state = self.state();
        if state.order.is_empty() || state.pending.is_empty() {
            return None;
        }
        let consumers = state.ordered_consumers();
        let messages = state.pending.drain_all();
        Some((messages, consumers))
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

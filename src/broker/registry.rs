//! Route registry
//!
//! Maps route names to their queues. The table lock only covers lookup and
//! insert; everything after that goes through the queue's own lock so
//! unrelated routes never wait on each other.
//!
//! The registry is an ordinary value. The server builds one and hands an
//! `Arc` of it to every connection handler, and tests build as many
//! independent registries as they like.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::queue::Queue;
use crate::protocol::QueueDescriptor;
use crate::utils::error::BrokerError;

#[derive(Debug)]
pub struct RouteRegistry {
    routes: Mutex<HashMap<String, Arc<Queue>>>,
    strict_redeclare: bool,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RouteRegistry {
    /// With `strict_redeclare`, declaring an existing route with a
    /// different `Type` or `Durable` fails instead of being ignored.
    pub fn new(strict_redeclare: bool) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            strict_redeclare,
        }
    }

    /// Return the queue for `descriptor.name`, creating it and starting its
    /// listener if this is the first declaration. An existing queue is
    /// never modified.
    pub fn get_or_create(&self, descriptor: &QueueDescriptor) -> Result<Arc<Queue>, BrokerError> {
        let mut routes = self.table();

        if let Some(queue) = routes.get(&descriptor.name) {
            if queue.matches(descriptor) {
                return Ok(Arc::clone(queue));
            }
            if self.strict_redeclare {
                return Err(BrokerError::DeclarationMismatch {
                    route: descriptor.name.clone(),
                    existing_kind: queue.kind().to_string(),
                    existing_durable: queue.durable(),
                    requested_kind: descriptor.kind.clone(),
                    requested_durable: descriptor.durable,
                });
            }
            tracing::warn!(
                route = %descriptor.name,
                existing_kind = %queue.kind(),
                requested_kind = %descriptor.kind,
                "ignoring conflicting re-declaration"
            );
            return Ok(Arc::clone(queue));
        }

        let queue = Arc::new(Queue::new(descriptor));
        routes.insert(descriptor.name.clone(), Arc::clone(&queue));
        queue.spawn_listener();
        tracing::info!(
            route = %descriptor.name,
            kind = %descriptor.kind,
            durable = descriptor.durable,
            "queue created"
        );
        Ok(queue)
    }

    /// Find an existing queue. Never creates one.
    pub fn lookup(&self, name: &str) -> Result<Arc<Queue>, BrokerError> {
        self.table()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::RouteNotFound(name.to_string()))
    }

    /// Declared route names, sorted.
    pub fn routes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<Queue>>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

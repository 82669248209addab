//! In-process event channel.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use thiserror::Error;

use crate::bus::{EventBus, Handler, PublishReport, Subscription};
use crate::Event;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Publish failed due to internal lock poisoning.
    #[error("event registry lock poisoned")]
    Poisoned,

    /// A handler published the topic that is currently being delivered on
    /// the same thread.
    #[error("recursive publish of '{0}' rejected")]
    ReentrantPublish(&'static str),
}

struct Registration<M> {
    id: u64,
    handler: Handler<M>,
}

impl<M> Clone for Registration<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

type Registry<M> = HashMap<<M as Event>::Topic, Vec<Registration<M>>>;

/// In-memory pub/sub channel.
///
/// - No IO / no async
/// - Synchronous fan-out on the publishing thread
/// - Handler errors and panics are caught and logged
/// - Same-topic recursion on one thread is rejected instead of looping
pub struct InMemoryEventBus<M: Event> {
    registry: Arc<Mutex<Registry<M>>>,
    next_id: AtomicU64,
    in_flight: Mutex<HashSet<(ThreadId, M::Topic)>>,
}

impl<M: Event> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of live registrations for `topic`.
    pub fn subscriber_count(&self, topic: M::Topic) -> usize {
        self.registry
            .lock()
            .map(|reg| reg.get(&topic).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn snapshot(&self, topic: M::Topic) -> Result<Vec<Registration<M>>, BusError> {
        let reg = self.registry.lock().map_err(|_| BusError::Poisoned)?;
        Ok(reg.get(&topic).cloned().unwrap_or_default())
    }
}

impl<M: Event> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            in_flight: Mutex::new(HashSet::new()),
        }
    }
}

impl<M: Event> core::fmt::Debug for InMemoryEventBus<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let topics = self.registry.lock().map(|reg| reg.len()).unwrap_or(0);
        f.debug_struct("InMemoryEventBus")
            .field("topics", &topics)
            .finish_non_exhaustive()
    }
}

/// Marks `(thread, topic)` as being delivered for the lifetime of a publish pass.
struct DeliveryMark<'a, T: Copy + Eq + core::hash::Hash> {
    in_flight: &'a Mutex<HashSet<(ThreadId, T)>>,
    key: (ThreadId, T),
}

impl<'a, T: Copy + Eq + core::hash::Hash> DeliveryMark<'a, T> {
    fn enter(in_flight: &'a Mutex<HashSet<(ThreadId, T)>>, topic: T) -> Result<Option<Self>, BusError> {
        let key = (thread::current().id(), topic);
        let mut set = in_flight.lock().map_err(|_| BusError::Poisoned)?;
        if !set.insert(key) {
            return Ok(None);
        }
        Ok(Some(Self { in_flight, key }))
    }
}

impl<T: Copy + Eq + core::hash::Hash> Drop for DeliveryMark<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.key);
        }
    }
}

impl<M: Event> EventBus<M> for InMemoryEventBus<M> {
    type Error = BusError;

    fn publish(&self, message: M) -> Result<PublishReport, Self::Error> {
        let topic = message.topic();
        let Some(_mark) = DeliveryMark::enter(&self.in_flight, topic)? else {
            tracing::warn!(event = message.event_type(), "recursive publish rejected");
            return Err(BusError::ReentrantPublish(message.event_type()));
        };

        // Handlers registered or removed during this pass are not observed.
        let handlers = self.snapshot(topic)?;

        let mut report = PublishReport::default();
        for registration in &handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| (registration.handler)(&message)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    tracing::error!(
                        event = message.event_type(),
                        subscription = registration.id,
                        error = %err,
                        "event handler failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        event = message.event_type(),
                        subscription = registration.id,
                        "event handler panicked"
                    );
                }
            }
        }

        Ok(report)
    }

    fn subscribe(&self, topic: M::Topic, handler: Handler<M>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // If the lock is poisoned, we still return a subscription;
        // it just never receives messages.
        let Ok(mut reg) = self.registry.lock() else {
            tracing::warn!(?topic, "event registry poisoned; subscription is inert");
            return Subscription::inert();
        };
        reg.entry(topic).or_default().push(Registration { id, handler });
        drop(reg);

        let registry = Arc::downgrade(&self.registry);
        Subscription::new(id, move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            if let Ok(mut reg) = registry.lock() {
                if let Some(list) = reg.get_mut(&topic) {
                    list.retain(|r| r.id != id);
                    if list.is_empty() {
                        reg.remove(&topic);
                    }
                }
            }
        })
    }
}

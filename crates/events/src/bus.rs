//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event channel pattern**: a pub/sub mechanism that
//! lets the session store notify UI regions it knows nothing about.
//!
//! ## Design Philosophy
//!
//! The channel is intentionally **lightweight** and makes minimal assumptions:
//!
//! - **Synchronous fan-out**: `publish` invokes every registered handler before returning
//! - **At-least-once delivery** to handlers registered at publish time
//! - **No ordering guarantees** among handlers of one topic, nor across topics
//! - **No persistence / no replay**: a handler registered after a publish never sees it
//!
//! Handler failures are isolated: one failing handler never prevents the others
//! from running, and never surfaces as a publish error.

use std::sync::{Arc, Mutex};

use crate::Event;

/// A registered event callback.
///
/// Handlers receive a reference to the published event and report failure via
/// `anyhow::Result`; the bus logs failures instead of propagating them.
pub type Handler<M> = Arc<dyn Fn(&M) -> anyhow::Result<()> + Send + Sync>;

/// Outcome of one publish pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl PublishReport {
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

type Disposer = Box<dyn FnOnce() + Send>;

/// Handle to a single handler registration.
///
/// Dropping a `Subscription` leaves the handler registered; call
/// [`Subscription::unsubscribe`] or convert it with
/// [`Subscription::into_guard`] for scope-bound registrations.
pub struct Subscription {
    id: u64,
    disposer: Mutex<Option<Disposer>>,
}

impl Subscription {
    pub fn new(id: u64, disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            disposer: Mutex::new(Some(Box::new(disposer))),
        }
    }

    /// A subscription that was never registered (nothing to dispose).
    pub fn inert() -> Self {
        Self {
            id: 0,
            disposer: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the registration. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let disposer = match self.disposer.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(dispose) = disposer {
            dispose();
        }
    }

    /// Tie the registration to a scope: unsubscribes when the guard drops.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Scope-bound [`Subscription`].
#[derive(Debug)]
pub struct SubscriptionGuard(Subscription);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

/// Domain-agnostic event channel (pub/sub abstraction).
///
/// ## Thread Safety
///
/// The trait requires `Send + Sync`; publishers on different threads may
/// publish concurrently. Implementations snapshot the handler set before
/// iterating, so (un)subscriptions made by a handler do not affect the pass
/// that is running.
pub trait EventBus<M: Event>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Invoke every handler currently registered for the event's topic.
    fn publish(&self, message: M) -> Result<PublishReport, Self::Error>;

    /// Register `handler` for `topic`.
    ///
    /// Registering the same handler twice yields two independent registrations.
    fn subscribe(&self, topic: M::Topic, handler: Handler<M>) -> Subscription;
}

impl<M, B> EventBus<M> for Arc<B>
where
    M: Event,
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<PublishReport, Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self, topic: M::Topic, handler: Handler<M>) -> Subscription {
        (**self).subscribe(topic, handler)
    }
}

/// Closure-friendly subscription helper.
pub trait EventBusExt<M: Event>: EventBus<M> {
    fn on<F>(&self, topic: M::Topic, handler: F) -> Subscription
    where
        F: Fn(&M) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(handler))
    }
}

impl<M: Event, B: EventBus<M> + ?Sized> EventBusExt<M> for B {}

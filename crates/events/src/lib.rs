//! `clinica-events` — in-process event channel for session changes.
//!
//! The channel is a narrow publish/subscribe seam: producers (the session
//! store) publish typed events, unrelated consumers subscribe per topic.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod session;

pub use bus::{EventBus, EventBusExt, Handler, PublishReport, Subscription, SubscriptionGuard};
pub use event::Event;
pub use in_memory_bus::{BusError, InMemoryEventBus};
pub use session::{SessionEvent, SessionTopic};

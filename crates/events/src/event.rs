/// A typed event carried by the event channel.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **owned** (subscribers get a reference to the publisher's copy, never to
///   the producer's live state)
/// - routed by a closed **topic** enumeration rather than free-form strings
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Closed set of topics this event family is routed by.
    type Topic: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Topic subscribers register for.
    fn topic(&self) -> Self::Topic;

    /// Stable event name (e.g. "user:updated"), used in logs.
    fn event_type(&self) -> &'static str;
}

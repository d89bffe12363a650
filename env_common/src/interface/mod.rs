mod event_store;
mod in_memory_store;
mod sinks;

pub use event_store::{EventStore, PendingPage};
pub use in_memory_store::InMemoryEventStore;
pub use sinks::{ErrorSink, EventFormatter, LoggingErrorSink, NotificationSink};

#[cfg(test)]
pub use sinks::{MockErrorSink, MockNotificationSink};

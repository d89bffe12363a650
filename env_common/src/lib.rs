mod config;
pub mod errors;
pub mod interface;
pub mod logic;

pub use config::{CloseOutPolicy, ForwarderConfig, DEFAULT_CHUNK_SIZE};
pub use errors::ProcessError;
pub use interface::{
    ErrorSink, EventFormatter, EventStore, InMemoryEventStore, LoggingErrorSink,
    NotificationSink, PendingPage,
};
pub use logic::{
    assemble, classify, classify_body, close_out, deliver_pages, detect, detect_all,
    forward_dead_letters, order_events, paginate, BatchReport, CloseOutSummary, Digest,
    DigestOutcome, EventForwarder, TriggerRules, DEAD_LETTER_SUBJECT,
    DEFAULT_DRIFT_STATUS_PATTERN, DEFAULT_STACK_STATUS_PATTERN,
};

mod classifier;
mod dead_letter;
mod delivery;
mod digest;
mod processor;
mod trigger;

pub use classifier::{classify, classify_body};

pub use trigger::{
    detect, detect_all, TriggerRules, DEFAULT_DRIFT_STATUS_PATTERN, DEFAULT_STACK_STATUS_PATTERN,
};

pub use digest::{assemble, order_events, paginate, Digest};

pub use delivery::{close_out, deliver_pages, CloseOutSummary};

pub use processor::{BatchReport, DigestOutcome, EventForwarder};

pub use dead_letter::{forward_dead_letters, DEAD_LETTER_SUBJECT};

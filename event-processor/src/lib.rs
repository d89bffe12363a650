pub mod config;
mod handler;
pub mod otel_tracing;
mod setup;
pub mod slack;

pub use config::{DeadLetterConfig, ProcessorConfig};
pub use handler::{batch_response, dead_letter_response, parse_batch};
pub use setup::{build_error_sink, build_forwarder};

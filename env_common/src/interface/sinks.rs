use async_trait::async_trait;
use env_defs::{DeliveryError, DigestLine, DigestPage, ErrorReport, StoredEvent};
use log::error;

/// Destination of digest pages, e.g. a chat webhook.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, page: &DigestPage) -> Result<(), DeliveryError>;
}

/// Destination of failure diagnostics that need a human to look at them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()>;
}

/// Turns one stored event into a display line. Kept apart from the engine so
/// ordering and de-duplication never depend on presentation.
pub trait EventFormatter: Send + Sync {
    fn render(&self, event: &StoredEvent) -> DigestLine;
}

/// Error sink of last resort when no topic or webhook is configured.
pub struct LoggingErrorSink;

#[async_trait]
impl ErrorSink for LoggingErrorSink {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
        error!(
            "{}: {} (context: {})",
            report.subject, report.message, report.context
        );
        Ok(())
    }
}

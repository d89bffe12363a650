use std::sync::Arc;

use env_defs::{ErrorReport, NotificationTrigger, SqsRecord, StoredEvent};
use futures::future::{join_all, try_join_all};
use log::{error, info, warn};
use serde_json::json;

use super::{assemble, classify_body, close_out, deliver_pages, detect_all};
use crate::interface::{ErrorSink, EventFormatter, EventStore, NotificationSink};
use crate::{ForwarderConfig, ProcessError};

/// What happened to one triggered stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Delivered {
        stack_id: String,
        pages: usize,
        closed: usize,
        already_closed: usize,
    },
    NothingPending {
        stack_id: String,
    },
    DeliveryFailed {
        stack_id: String,
        page: usize,
        reason: String,
    },
    /// Digest went out but some events could not be closed; they will show up
    /// again in the next digest for the stack.
    CloseOutIncomplete {
        stack_id: String,
        failed: usize,
    },
    Failed {
        stack_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub events_received: usize,
    pub events_stored: usize,
    pub digests: Vec<DigestOutcome>,
    pub error: Option<String>,
}

/// Entry point of the engine, built once per cold start from explicitly
/// constructed collaborators and invoked once per delivered batch.
pub struct EventForwarder {
    store: Arc<dyn EventStore>,
    sink: Arc<dyn NotificationSink>,
    error_sink: Arc<dyn ErrorSink>,
    formatter: Arc<dyn EventFormatter>,
    config: ForwarderConfig,
}

impl EventForwarder {
    pub fn new(
        store: Arc<dyn EventStore>,
        sink: Arc<dyn NotificationSink>,
        error_sink: Arc<dyn ErrorSink>,
        formatter: Arc<dyn EventFormatter>,
        config: ForwarderConfig,
    ) -> Self {
        EventForwarder {
            store,
            sink,
            error_sink,
            formatter,
            config,
        }
    }

    /// Processes one batch and never fails: anything that goes wrong is sent
    /// to the error sink, so the transport acknowledges the batch instead of
    /// redelivering it in a loop.
    pub async fn handle_batch(&self, records: &[SqsRecord]) -> BatchReport {
        let mut report = BatchReport {
            events_received: records.len(),
            ..Default::default()
        };

        let stored = match self.ingest(records).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to store batch of {} events: {}", records.len(), e);
                self.report_error(
                    "Stack event processing failed",
                    e.to_string(),
                    json!({ "events_received": records.len() }),
                )
                .await;
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.events_stored = stored.len();
        info!("Stored {} of {} received events", stored.len(), records.len());

        let triggers = detect_all(&self.config.trigger_rules, &stored);
        if triggers.is_empty() {
            info!("No stack completed in this batch");
            return report;
        }

        report.digests = join_all(triggers.iter().map(|trigger| self.flush_stack(trigger))).await;
        report
    }

    /// Classifies and stores every record concurrently; the first failure
    /// fails the whole batch.
    pub async fn ingest(&self, records: &[SqsRecord]) -> Result<Vec<StoredEvent>, ProcessError> {
        try_join_all(records.iter().map(|record| async move {
            let event = classify_body(record)?;
            self.store.put(&event).await?;
            info!(
                "Stored event {} for {} at {}",
                event.event_id, event.stack_id, event.time
            );
            Ok::<_, ProcessError>(event)
        }))
        .await
    }

    /// Sends the digest of a triggered stack and closes out its events once
    /// every page was delivered.
    pub async fn flush_stack(&self, trigger: &NotificationTrigger) -> DigestOutcome {
        let stack_id = trigger.stack_id.clone();

        let digest = match assemble(
            self.store.as_ref(),
            self.formatter.as_ref(),
            trigger,
            self.config.chunk_size,
        )
        .await
        {
            Ok(Some(digest)) => digest,
            Ok(None) => return DigestOutcome::NothingPending { stack_id },
            Err(e) => {
                self.report_error(
                    "Failed to read pending stack events",
                    e.to_string(),
                    json!({ "stack_id": stack_id }),
                )
                .await;
                return DigestOutcome::Failed {
                    stack_id,
                    reason: e.to_string(),
                };
            }
        };

        if let Err((page, e)) = deliver_pages(self.sink.as_ref(), &digest.pages).await {
            // Events stay pending and are sent again with the next digest for this stack
            self.report_error(
                "Failed to deliver stack event digest",
                e.to_string(),
                json!({
                    "stack_id": stack_id,
                    "page": page,
                    "total_pages": digest.pages.len(),
                }),
            )
            .await;
            return DigestOutcome::DeliveryFailed {
                stack_id,
                page,
                reason: e.to_string(),
            };
        }

        let summary = close_out(self.store.as_ref(), &digest.keys, self.config.close_out).await;
        if !summary.is_complete() {
            let reasons: Vec<String> = summary
                .failures
                .iter()
                .map(|(key, e)| format!("{}@{}: {}", key.stack_id, key.time, e))
                .collect();
            self.report_error(
                "Failed to close out notified stack events",
                reasons.join("\n"),
                json!({ "stack_id": stack_id, "failed": summary.failures.len() }),
            )
            .await;
            return DigestOutcome::CloseOutIncomplete {
                stack_id,
                failed: summary.failures.len(),
            };
        }

        DigestOutcome::Delivered {
            stack_id,
            pages: digest.pages.len(),
            closed: summary.closed,
            already_closed: summary.already_closed,
        }
    }

    async fn report_error(&self, subject: &str, message: String, context: serde_json::Value) {
        let report = ErrorReport {
            subject: subject.to_string(),
            message,
            context,
        };
        if let Err(e) = self.error_sink.report(&report).await {
            warn!("Failed to report error '{}': {}", report.subject, e);
        }
    }
}

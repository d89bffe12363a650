use env_defs::{ErrorReport, SqsRecord};
use futures::future::try_join_all;
use log::info;

use crate::interface::ErrorSink;

pub const DEAD_LETTER_SUBJECT: &str = "Forwarding Dlq messages to SNS topic";

/// Logs every dead-lettered message and republishes it verbatim to the error
/// sink. Returns the number of forwarded messages.
pub async fn forward_dead_letters(
    records: &[SqsRecord],
    sink: &dyn ErrorSink,
) -> anyhow::Result<usize> {
    try_join_all(records.iter().map(|record| async move {
        info!(
            "Forwarding dead-lettered message {}: {}",
            record.message_id, record.body
        );
        let report = ErrorReport {
            subject: DEAD_LETTER_SUBJECT.to_string(),
            message: serde_json::to_string(record)?,
            context: serde_json::json!({ "message_id": record.message_id }),
        };
        sink.report(&report).await
    }))
    .await?;

    Ok(records.len())
}

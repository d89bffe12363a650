use env_common::BatchReport;
use env_defs::SqsEvent;
use log::warn;
use serde_json::{json, Value};

fn response(status_code: u16, body: Value) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "text/json" },
        "body": body,
    })
}

/// Reads the queue batch out of the invocation payload. A payload that is not
/// an SQS event is treated as an empty batch.
pub fn parse_batch(payload: Value) -> SqsEvent {
    serde_json::from_value(payload).unwrap_or_else(|e| {
        warn!("Invocation payload is not an SQS batch: {}", e);
        SqsEvent::default()
    })
}

/// The processor always answers 200 so the batch is not redelivered.
pub fn batch_response(report: &BatchReport) -> Value {
    let mut body = json!({ "EventsReceived": report.events_received });
    if let Some(error) = &report.error {
        body["Error"] = json!(error);
    }
    response(200, body)
}

pub fn dead_letter_response(events_received: usize, result: &anyhow::Result<usize>) -> Value {
    match result {
        Ok(_) => response(200, json!({ "EventsReceived": events_received })),
        Err(e) => response(
            400,
            json!({ "EventsReceived": events_received, "Error": e.to_string() }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_batch_response() {
        let mut report = BatchReport {
            events_received: 3,
            events_stored: 3,
            ..Default::default()
        };
        assert_eq!(
            batch_response(&report),
            json!({
                "statusCode": 200,
                "headers": {"Content-Type": "text/json"},
                "body": {"EventsReceived": 3}
            })
        );

        report.error = Some("Failed to write to the event store: throttled".to_string());
        let value = batch_response(&report);
        assert_eq!(value["statusCode"], 200);
        assert_eq!(
            value["body"]["Error"],
            "Failed to write to the event store: throttled"
        );
    }

    #[test]
    fn test_dead_letter_response() {
        assert_eq!(dead_letter_response(2, &Ok(2))["statusCode"], 200);

        let failed = dead_letter_response(2, &Err(anyhow::anyhow!("AuthorizationError")));
        assert_eq!(failed["statusCode"], 400);
        assert_eq!(failed["body"]["Error"], "AuthorizationError");
    }

    #[test]
    fn test_parse_batch() {
        let batch = parse_batch(json!({
            "Records": [{
                "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
                "body": "{}",
                "eventSource": "aws:sqs"
            }]
        }));
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].message_id, "059f36b4-87a3-44ab-83d2-661975830a7d");
        assert_eq!(batch.records[0].extra["eventSource"], "aws:sqs");

        assert!(parse_batch(json!({"detail-type": "Scheduled Event"})).records.is_empty());
        assert!(parse_batch(json!("not an object")).records.is_empty());
    }
}

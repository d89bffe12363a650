use env_defs::{
    CfnEventDetail, ClassifyError, EventType, RawEventEnvelope, SqsRecord, StoredEvent,
};
use env_utils::iso_to_epoch_millis;
use log::{debug, warn};
use serde_json::Value;

use crate::ProcessError;

/// Normalizes one envelope into the record we persist.
///
/// Unknown detail-types and details that do not match their schema are kept
/// as unclassified events (empty type and status, raw detail preserved). The
/// only hard failure is a `time` that cannot be parsed, since it is part of
/// the store key.
pub fn classify(envelope: &RawEventEnvelope) -> Result<StoredEvent, ClassifyError> {
    let time = iso_to_epoch_millis(&envelope.time).map_err(|e| ClassifyError::InvalidTime {
        time: envelope.time.clone(),
        reason: e.to_string(),
    })?;

    let mut event = StoredEvent {
        event_id: envelope.id.clone(),
        stack_id: fallback_stack_id(envelope),
        time,
        event_type: EventType::Unclassified,
        detail: envelope.detail.to_string(),
        region: envelope.region.clone(),
        account: envelope.account.clone(),
        resources: envelope.resources.clone(),
        notified: false,
        ..Default::default()
    };

    let detail = match CfnEventDetail::parse(&envelope.detail_type, &envelope.detail) {
        Ok(detail) => detail,
        Err(e) => {
            warn!("Keeping event {} unclassified: {}", envelope.id, e);
            return Ok(event);
        }
    };

    if !detail.stack_id().is_empty() {
        event.stack_id = detail.stack_id().to_string();
    }
    event.event_type = detail.event_type();
    event.client_request_token = detail.client_request_token().to_string();

    match detail {
        CfnEventDetail::ResourceStatusChange(d) => {
            event.status = d.status_details.status;
            event.status_reason = d.status_details.status_reason;
            event.resource_type = d.resource_type;
            event.logical_resource_id = d.logical_resource_id;
            event.physical_resource_id = d.physical_resource_id;
        }
        CfnEventDetail::StackStatusChange(d) => {
            event.status = d.status_details.status;
            event.status_reason = d.status_details.status_reason;
        }
        CfnEventDetail::DriftDetectionStatusChange(d) => {
            // CloudFormation sometimes leaves stack-drift-status empty and only
            // reports detection-status, use that as the status in that case.
            event.status = if d.status_details.stack_drift_status.is_empty() {
                d.status_details.detection_status.clone()
            } else {
                d.status_details.stack_drift_status
            };
            event.detection_status = d.status_details.detection_status;
            event.drift_detection_details = match d.drift_detection_details {
                Value::Null => String::new(),
                details => details.to_string(),
            };
        }
    }

    debug!(
        "Classified event {} for {} as '{}' with status '{}'",
        event.event_id,
        event.stack_id,
        event.event_type.as_str(),
        event.status
    );
    Ok(event)
}

/// Parses a queue message body and classifies the envelope it carries.
pub fn classify_body(record: &SqsRecord) -> Result<StoredEvent, ProcessError> {
    let envelope: RawEventEnvelope =
        serde_json::from_str(&record.body).map_err(|e| ProcessError::InvalidEnvelope {
            message_id: record.message_id.clone(),
            reason: e.to_string(),
        })?;
    Ok(classify(&envelope)?)
}

// The stack id is the partition key and cannot be empty, so events without a
// `stack-id` are grouped under their first resource, or their own id.
fn fallback_stack_id(envelope: &RawEventEnvelope) -> String {
    envelope
        .detail
        .get("stack-id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .or_else(|| envelope.resources.first().cloned())
        .unwrap_or_else(|| envelope.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const STACK_ID: &str = "arn:aws:cloudformation:eu-west-1:111122223333:stack/demo/1a2b";

    fn envelope(detail_type: &str, detail: Value) -> RawEventEnvelope {
        RawEventEnvelope {
            id: "evt-1".to_string(),
            source: "aws.cloudformation".to_string(),
            detail_type: detail_type.to_string(),
            time: "2022-08-19T11:25:58Z".to_string(),
            region: "eu-west-1".to_string(),
            account: "111122223333".to_string(),
            resources: vec![STACK_ID.to_string()],
            detail,
        }
    }

    #[test]
    fn test_classify_resource_change() {
        let env = envelope(
            "CloudFormation Resource Status Change",
            json!({
                "stack-id": STACK_ID,
                "logical-resource-id": "Queue",
                "physical-resource-id": "https://sqs.eu-west-1.amazonaws.com/1/q",
                "resource-type": "AWS::SQS::Queue",
                "client-request-token": "tok-1",
                "status-details": {"status": "CREATE_COMPLETE", "status-reason": "done"}
            }),
        );

        let event = classify(&env).unwrap();
        assert_eq!(event.event_type, EventType::ResourceChange);
        assert_eq!(event.stack_id, STACK_ID);
        assert_eq!(event.time, 1660908358000);
        assert_eq!(event.status, "CREATE_COMPLETE");
        assert_eq!(event.status_reason, "done");
        assert_eq!(event.resource_type, "AWS::SQS::Queue");
        assert_eq!(event.logical_resource_id, "Queue");
        assert_eq!(event.physical_resource_id, "https://sqs.eu-west-1.amazonaws.com/1/q");
        assert_eq!(event.client_request_token, "tok-1");
        assert_eq!(event.detection_status, "");
        assert_eq!(event.drift_detection_details, "");
        assert!(!event.notified);
    }

    #[test]
    fn test_classify_stack_change_leaves_resource_fields_empty() {
        let env = envelope(
            "CloudFormation Stack Status Change",
            json!({
                "stack-id": STACK_ID,
                "status-details": {"status": "UPDATE_COMPLETE", "status-reason": ""}
            }),
        );

        let event = classify(&env).unwrap();
        assert_eq!(event.event_type, EventType::StackChange);
        assert_eq!(event.status, "UPDATE_COMPLETE");
        assert_eq!(event.resource_type, "");
        assert_eq!(event.logical_resource_id, "");
        assert_eq!(event.physical_resource_id, "");
        assert_eq!(event.detection_status, "");
    }

    #[test]
    fn test_classify_drift_change() {
        let env = envelope(
            "CloudFormation Drift Detection Status Change",
            json!({
                "stack-id": STACK_ID,
                "stack-drift-detection-id": "d-1",
                "status-details": {
                    "stack-drift-status": "DRIFTED",
                    "detection-status": "DETECTION_COMPLETE"
                },
                "drift-detection-details": {"drifted-stack-resource-count": 2}
            }),
        );

        let event = classify(&env).unwrap();
        assert_eq!(event.event_type, EventType::DriftChange);
        assert_eq!(event.status, "DRIFTED");
        assert_eq!(event.detection_status, "DETECTION_COMPLETE");
        assert_eq!(
            event.drift_detection_details,
            r#"{"drifted-stack-resource-count":2}"#
        );
        assert_eq!(event.status_reason, "");
    }

    #[test]
    fn test_classify_drift_falls_back_to_detection_status() {
        let env = envelope(
            "CloudFormation Drift Detection Status Change",
            json!({
                "stack-id": STACK_ID,
                "status-details": {"detection-status": "DETECTION_IN_PROGRESS"}
            }),
        );

        let event = classify(&env).unwrap();
        assert_eq!(event.status, "DETECTION_IN_PROGRESS");
        assert_eq!(event.detection_status, "DETECTION_IN_PROGRESS");
    }

    #[test]
    fn test_classify_unknown_detail_type_keeps_raw_detail() {
        let env = envelope(
            "CloudFormation Something New",
            json!({"stack-id": STACK_ID, "whatever": [1, 2]}),
        );

        let event = classify(&env).unwrap();
        assert_eq!(event.event_type, EventType::Unclassified);
        assert_eq!(event.status, "");
        assert_eq!(event.stack_id, STACK_ID);
        let detail: Value = serde_json::from_str(&event.detail).unwrap();
        assert_eq!(detail["whatever"], json!([1, 2]));
    }

    #[test]
    fn test_classify_unknown_without_stack_id_uses_resource() {
        let mut env = envelope("Other", json!({}));
        env.resources = vec!["arn:aws:s3:::bucket".to_string()];
        assert_eq!(classify(&env).unwrap().stack_id, "arn:aws:s3:::bucket");

        env.resources.clear();
        assert_eq!(classify(&env).unwrap().stack_id, "evt-1");
    }

    #[test]
    fn test_classify_rejects_invalid_time() {
        let mut env = envelope("CloudFormation Stack Status Change", json!({}));
        env.time = "not a time".to_string();
        assert!(matches!(
            classify(&env),
            Err(ClassifyError::InvalidTime { .. })
        ));
    }

    #[test]
    fn test_classify_body_rejects_garbage() {
        let record = SqsRecord {
            message_id: "m-1".to_string(),
            body: "{not json".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            classify_body(&record),
            Err(ProcessError::InvalidEnvelope { .. })
        ));
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{ClassifyError, EventType};

/// EventBridge envelope as it arrives in the body of a queue message.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RawEventEnvelope {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub time: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub detail: Value,
}

// CloudFormation sends `null` for some reasons and ids, treat them as empty.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct StatusDetails {
    #[serde(deserialize_with = "nullable_string")]
    pub status: String,
    #[serde(deserialize_with = "nullable_string")]
    pub status_reason: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct DriftStatusDetails {
    #[serde(deserialize_with = "nullable_string")]
    pub stack_drift_status: String,
    #[serde(deserialize_with = "nullable_string")]
    pub detection_status: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResourceStatusChangeDetail {
    #[serde(deserialize_with = "nullable_string")]
    pub stack_id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub logical_resource_id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub physical_resource_id: String,
    pub status_details: StatusDetails,
    #[serde(deserialize_with = "nullable_string")]
    pub resource_type: String,
    #[serde(deserialize_with = "nullable_string")]
    pub client_request_token: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct StackStatusChangeDetail {
    #[serde(deserialize_with = "nullable_string")]
    pub stack_id: String,
    pub status_details: StatusDetails,
    #[serde(deserialize_with = "nullable_string")]
    pub client_request_token: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct DriftDetectionStatusChangeDetail {
    #[serde(deserialize_with = "nullable_string")]
    pub stack_id: String,
    #[serde(deserialize_with = "nullable_string")]
    pub stack_drift_detection_id: String,
    pub status_details: DriftStatusDetails,
    pub drift_detection_details: Value,
    #[serde(deserialize_with = "nullable_string")]
    pub client_request_token: String,
}

/// Typed view of an envelope's `detail`, one variant per known detail-type.
#[derive(Clone, Debug, PartialEq)]
pub enum CfnEventDetail {
    ResourceStatusChange(ResourceStatusChangeDetail),
    StackStatusChange(StackStatusChangeDetail),
    DriftDetectionStatusChange(DriftDetectionStatusChangeDetail),
}

impl CfnEventDetail {
    pub fn parse(detail_type: &str, detail: &Value) -> Result<Self, ClassifyError> {
        let parsed = match EventType::from_detail_type(detail_type) {
            EventType::ResourceChange => {
                serde_json::from_value(detail.clone()).map(CfnEventDetail::ResourceStatusChange)
            }
            EventType::StackChange => {
                serde_json::from_value(detail.clone()).map(CfnEventDetail::StackStatusChange)
            }
            EventType::DriftChange => serde_json::from_value(detail.clone())
                .map(CfnEventDetail::DriftDetectionStatusChange),
            EventType::Unclassified => {
                return Err(ClassifyError::UnknownDetailType(detail_type.to_string()))
            }
        };

        parsed.map_err(|e| ClassifyError::MalformedDetail {
            detail_type: detail_type.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn event_type(&self) -> EventType {
        match self {
            CfnEventDetail::ResourceStatusChange(_) => EventType::ResourceChange,
            CfnEventDetail::StackStatusChange(_) => EventType::StackChange,
            CfnEventDetail::DriftDetectionStatusChange(_) => EventType::DriftChange,
        }
    }

    pub fn stack_id(&self) -> &str {
        match self {
            CfnEventDetail::ResourceStatusChange(d) => &d.stack_id,
            CfnEventDetail::StackStatusChange(d) => &d.stack_id,
            CfnEventDetail::DriftDetectionStatusChange(d) => &d.stack_id,
        }
    }

    pub fn client_request_token(&self) -> &str {
        match self {
            CfnEventDetail::ResourceStatusChange(d) => &d.client_request_token,
            CfnEventDetail::StackStatusChange(d) => &d.client_request_token,
            CfnEventDetail::DriftDetectionStatusChange(d) => &d.client_request_token,
        }
    }
}

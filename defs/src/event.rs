use serde::{Deserialize, Serialize};

/// Category of a stored event. Serialized as the EventBridge detail-type so
/// the table stays readable next to the raw envelopes.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum EventType {
    #[serde(rename = "CloudFormation Resource Status Change")]
    ResourceChange,
    #[serde(rename = "CloudFormation Stack Status Change")]
    StackChange,
    #[serde(rename = "CloudFormation Drift Detection Status Change")]
    DriftChange,
    #[default]
    #[serde(rename = "")]
    Unclassified,
}

impl EventType {
    pub const RESOURCE_STATUS_CHANGE: &'static str = "CloudFormation Resource Status Change";
    pub const STACK_STATUS_CHANGE: &'static str = "CloudFormation Stack Status Change";
    pub const DRIFT_DETECTION_STATUS_CHANGE: &'static str =
        "CloudFormation Drift Detection Status Change";

    pub fn from_detail_type(detail_type: &str) -> Self {
        match detail_type {
            Self::RESOURCE_STATUS_CHANGE => EventType::ResourceChange,
            Self::STACK_STATUS_CHANGE => EventType::StackChange,
            Self::DRIFT_DETECTION_STATUS_CHANGE => EventType::DriftChange,
            _ => EventType::Unclassified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ResourceChange => Self::RESOURCE_STATUS_CHANGE,
            EventType::StackChange => Self::STACK_STATUS_CHANGE,
            EventType::DriftChange => Self::DRIFT_DETECTION_STATUS_CHANGE,
            EventType::Unclassified => "",
        }
    }
}

pub const NOTIFIED_FALSE: &str = "false";
pub const NOTIFIED_TRUE: &str = "true";

/// Primary key of the event table: partition on the stack, sort on event time.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct EventKey {
    pub stack_id: String,
    pub time: i64,
}

/// Normalized CloudFormation event as persisted in the event store.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredEvent {
    pub event_id: String,
    pub stack_id: String,
    /// Epoch milliseconds
    pub time: i64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub status: String,
    pub status_reason: String,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub physical_resource_id: String,
    pub detection_status: String,
    pub drift_detection_details: String,
    pub detail: String,
    pub region: String,
    pub account: String,
    pub resources: Vec<String>,
    pub client_request_token: String,
    #[serde(with = "notified_flag")]
    pub notified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_time: Option<i64>,
}

impl StoredEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            stack_id: self.stack_id.clone(),
            time: self.time,
        }
    }
}

// The pending index sorts on `notified`, so it has to stay a string attribute.
mod notified_flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{NOTIFIED_FALSE, NOTIFIED_TRUE};

    pub fn serialize<S: Serializer>(notified: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *notified {
            NOTIFIED_TRUE
        } else {
            NOTIFIED_FALSE
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            NOTIFIED_TRUE => Ok(true),
            NOTIFIED_FALSE => Ok(false),
            other => Err(D::Error::custom(format!(
                "invalid notified flag '{}', expected 'true' or 'false'",
                other
            ))),
        }
    }
}

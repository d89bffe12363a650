use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Batch delivered by an SQS event source mapping.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub body: String,
    // Attributes, receipt handle, source ARN... kept verbatim for dead-letter forwarding
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

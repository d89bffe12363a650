use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Unrecognized detail-type '{0}'")]
    UnknownDetailType(String),

    #[error("Detail of '{detail_type}' does not match its schema: {reason}")]
    MalformedDetail { detail_type: String, reason: String },

    #[error("Event time '{time}' is not a valid ISO-8601 timestamp: {reason}")]
    InvalidTime { time: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write to the event store: {0}")]
    Write(String),

    #[error("Failed to query the event store: {0}")]
    Query(String),

    #[error("Event {stack_id}@{time} was already notified")]
    ConditionalCheckFailed { stack_id: String, time: i64 },

    #[error("Failed to convert event store item: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Notification sink rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to reach the notification sink: {0}")]
    Transport(String),

    #[error("Failed to render the message: {0}")]
    Render(String),
}

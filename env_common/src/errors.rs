use env_defs::{ClassifyError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Message {message_id} does not carry a valid event envelope: {reason}")]
    InvalidEnvelope { message_id: String, reason: String },

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

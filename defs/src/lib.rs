mod envelope;
mod errors;
mod event;
mod notification;
mod sqs;

pub use envelope::{
    CfnEventDetail, DriftDetectionStatusChangeDetail, DriftStatusDetails, RawEventEnvelope,
    ResourceStatusChangeDetail, StackStatusChangeDetail, StatusDetails,
};
pub use errors::{ClassifyError, DeliveryError, StoreError};
pub use event::{EventKey, EventType, StoredEvent, NOTIFIED_FALSE, NOTIFIED_TRUE};
pub use notification::{DigestLine, DigestPage, ErrorReport, NotificationTrigger};
pub use sqs::{SqsEvent, SqsRecord};

mod event_store;
mod notification;
mod utils;

pub use event_store::{DynamoEventStore, BATCH_WRITE_LIMIT};
pub use notification::SnsErrorSink;
pub use utils::{dynamodb_client, get_aws_config, sns_client};

use std::sync::Arc;

use anyhow::Result;
use env_aws::{dynamodb_client, sns_client, DynamoEventStore, SnsErrorSink};
use env_common::{ErrorSink, EventForwarder, LoggingErrorSink};
use log::{info, warn};

use crate::slack::{SlackErrorSink, SlackFormatter, SlackWebhookSink};
use crate::ProcessorConfig;

/// Error sink for the processor: SNS topic when configured, then the error
/// webhook, then logging only.
pub async fn build_error_sink(config: &ProcessorConfig) -> Result<Arc<dyn ErrorSink>> {
    if let Some(topic_arn) = &config.error_topic_arn {
        info!("Reporting errors to SNS topic {}", topic_arn);
        let client = sns_client(config.region.as_deref()).await;
        return Ok(Arc::new(SnsErrorSink::new(client, topic_arn)));
    }
    if let Some(hook) = &config.error_slack_hook {
        info!("Reporting errors to the error webhook");
        return Ok(Arc::new(SlackErrorSink::new(hook)?));
    }
    warn!("No error topic or error webhook configured, errors are only logged");
    Ok(Arc::new(LoggingErrorSink))
}

pub async fn build_forwarder(config: &ProcessorConfig) -> Result<EventForwarder> {
    let client = dynamodb_client(config.region.as_deref()).await;
    let store = DynamoEventStore::new(
        client,
        &config.table_name,
        &config.pending_index,
        config.query_paging_limit,
    );

    Ok(EventForwarder::new(
        Arc::new(store),
        Arc::new(SlackWebhookSink::new(&config.slack_hook)?),
        build_error_sink(config).await?,
        Arc::new(SlackFormatter),
        config.forwarder_config()?,
    ))
}

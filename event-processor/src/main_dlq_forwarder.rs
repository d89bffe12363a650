use env_aws::{sns_client, SnsErrorSink};
use env_common::forward_dead_letters;
use env_utils::setup_logging;
use event_processor::otel_tracing;
use event_processor::{dead_letter_response, parse_batch, DeadLetterConfig};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::{error, info};
use serde_json::Value;
use tracing::{instrument, Span};

#[instrument(skip(event, sink), fields(request_id, events_received))]
async fn handler(event: LambdaEvent<Value>, sink: &SnsErrorSink) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();

    let span = Span::current();
    span.record("request_id", context.request_id.as_str());

    let batch = parse_batch(payload);
    span.record("events_received", batch.records.len());

    let result = forward_dead_letters(&batch.records, sink).await;
    match &result {
        Ok(count) => info!("Forwarded {} dead-lettered messages", count),
        Err(e) => error!("Failed to forward dead-lettered messages: {}", e),
    }

    Ok(dead_letter_response(batch.records.len(), &result))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    if let Err(e) = otel_tracing::init_tracing("dlq-forwarder") {
        eprintln!("OpenTelemetry disabled ({}), logging to stderr", e);
        if let Err(e) = setup_logging("dlq-forwarder") {
            eprintln!("Failed to set up logging: {}", e);
        }
    }

    let config = DeadLetterConfig::from_env()?;
    let sink = SnsErrorSink::new(sns_client(config.region.as_deref()).await, &config.topic_arn);
    let sink = &sink;

    info!("Starting dead-letter forwarder for topic {}", config.topic_arn);

    let result = lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(event, sink).await
    }))
    .await;

    otel_tracing::shutdown_tracing();

    result
}

use env_common::EventForwarder;
use env_utils::setup_logging;
use event_processor::otel_tracing;
use event_processor::{batch_response, build_forwarder, parse_batch, ProcessorConfig};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::info;
use serde_json::Value;
use tracing::{instrument, Span};

#[instrument(skip(event, forwarder), fields(request_id, events_received))]
async fn handler(event: LambdaEvent<Value>, forwarder: &EventForwarder) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();

    let span = Span::current();
    span.record("request_id", context.request_id.as_str());

    let batch = parse_batch(payload);
    span.record("events_received", batch.records.len());

    let report = forwarder.handle_batch(&batch.records).await;
    info!(
        "Batch done: {} received, {} stored, {} digests",
        report.events_received,
        report.events_stored,
        report.digests.len()
    );

    Ok(batch_response(&report))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    if let Err(e) = otel_tracing::init_tracing("stack-event-processor") {
        eprintln!("OpenTelemetry disabled ({}), logging to stderr", e);
        if let Err(e) = setup_logging("stack-event-processor") {
            eprintln!("Failed to set up logging: {}", e);
        }
    }

    let config = ProcessorConfig::from_env()?;
    let forwarder = build_forwarder(&config).await?;
    let forwarder = &forwarder;

    info!("Starting stack event processor for table {}", config.table_name);

    let result = lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(event, forwarder).await
    }))
    .await;

    otel_tracing::shutdown_tracing();

    result
}

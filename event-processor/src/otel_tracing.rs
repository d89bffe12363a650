use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Config, TracerProvider};
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,event_processor=debug,env_common=debug,aws_smithy_runtime=warn";

/// Sets up `tracing` with an OTLP span exporter (e.g. the ADOT Lambda layer).
///
/// Fails when `OTEL_EXPORTER_OTLP_ENDPOINT` is not set so the caller can fall
/// back to plain stderr logging.
pub fn init_tracing(service_name: &str) -> anyhow::Result<()> {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .map_err(|_| anyhow::anyhow!("OTEL_EXPORTER_OTLP_ENDPOINT is not set"))?;

    let mut attributes = vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ];
    if let Ok(function_name) = std::env::var("AWS_LAMBDA_FUNCTION_NAME") {
        attributes.push(KeyValue::new("faas.name", function_name));
    }
    if let Ok(region) = std::env::var("AWS_REGION") {
        attributes.push(KeyValue::new("cloud.region", region));
    }

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .with_timeout(Duration::from_secs(3))
        .build()?;

    let tracer_provider = TracerProvider::builder()
        .with_config(Config::default().with_resource(Resource::new(attributes)))
        .with_batch_exporter(otlp_exporter, opentelemetry_sdk::runtime::Tokio)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    let tracer = tracer_provider.tracer(service_name.to_string());
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // `log` records from the library crates are forwarded by the subscriber
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .with(telemetry_layer)
        .try_init()?;

    Ok(())
}

/// Flushes pending spans before the runtime exits.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}

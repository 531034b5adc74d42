use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{Tracer, TracerProvider},
};
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Logging to stdout, span export when an OTLP collector is configured, and
/// the Prometheus recorder. Must run once, before anything logs.
pub fn init_telemetry() -> anyhow::Result<()> {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let tracer = otlp_endpoint.as_deref().map(otlp_tracer).transpose()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()?;

    match otlp_endpoint {
        Some(endpoint) => tracing::info!("Exporting spans to {}", endpoint),
        None => tracing::info!("Span export off (OTEL_EXPORTER_OTLP_ENDPOINT not set)"),
    }

    init_metrics()
}

fn otlp_tracer(endpoint: &str) -> anyhow::Result<Tracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();
    let tracer = provider.tracer("lens-api");
    opentelemetry::global::set_tracer_provider(provider);
    Ok(tracer)
}

fn init_metrics() -> anyhow::Result<()> {
    // Downloads dominate; inference on CPU sits in the 50ms-1s range.
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("prediction_duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )?
        .install_recorder()?;

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics already initialized");
    }

    metrics::describe_counter!(
        "predictions_total",
        "Prediction requests by outcome (ok, fetch, decode, inference, configuration)"
    );
    metrics::describe_histogram!(
        "prediction_duration_seconds",
        "End-to-end prediction latency in seconds"
    );

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

pub async fn handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics not initialized".to_string(),
        ),
    }
}

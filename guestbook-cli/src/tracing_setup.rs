//! Tracing and OpenTelemetry setup for the guestbook binary
//!
//! Usage:
//!   guestbook --debug                  # Debug logging to console
//!   guestbook --trace-key KEY          # Per-request spans (+ OTLP export with `telemetry`)
//!   RUST_LOG=guestbook=debug guestbook # Fine-grained log control
//!
//! Environment variables:
//!   RUST_LOG                           # Log filter (default: info)
//!   OTEL_EXPORTER_OTLP_ENDPOINT        # OTLP endpoint (default: http://localhost:4317)
//!   OTEL_SERVICE_NAME                  # Service name (default: guestbook)

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (sets RUST_LOG=debug if not already set)
    pub debug: bool,
    /// Tracing-provider license key; its presence turns request tracing on
    pub trace_key: Option<String>,
}

impl TracingConfig {
    pub fn tracing_enabled(&self) -> bool {
        self.trace_key.is_some()
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    // Debug mode: set debug level unless RUST_LOG is explicitly set
    let default = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing with console output only (no OTEL)
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config.debug))
        .with_target(config.debug) // Show targets in debug mode
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

/// Initialize tracing with OpenTelemetry OTLP export.
///
/// The trace key is sent to the collector as the `api-key` header.
#[cfg(feature = "telemetry")]
pub fn init_tracing_with_otel(config: &TracingConfig, key: &str) -> Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
    use opentelemetry_sdk::trace::TracerProvider;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "guestbook".to_string());

    let mut metadata = tonic::metadata::MetadataMap::new();
    metadata.insert(
        "api-key",
        key.parse()
            .map_err(|e| anyhow!("Trace key is not a valid header value: {}", e))?,
    );

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_metadata(metadata)
        .build()
        .map_err(|e| anyhow!("Failed to create OTLP exporter: {}", e))?;

    let resource = opentelemetry_sdk::Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.clone(),
    )]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(otlp_exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("guestbook");
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    // Held globally; dropping the provider stops export.
    let _ = opentelemetry::global::set_tracer_provider(provider);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.debug)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(config.debug))
        .with(fmt_layer)
        .with(telemetry_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    tracing::info!(
        endpoint = %endpoint,
        service = %service_name,
        "OpenTelemetry tracing initialized"
    );

    Ok(())
}

/// Shutdown OpenTelemetry (flush pending spans)
#[cfg(feature = "telemetry")]
pub fn shutdown_otel() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// No-op shutdown when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub fn shutdown_otel() {}

/// Initialize tracing based on configuration
///
/// Exports to OTLP only when a trace key is given and the `telemetry`
/// feature is compiled in.
pub fn init(config: &TracingConfig) -> Result<()> {
    #[cfg(feature = "telemetry")]
    if let Some(key) = &config.trace_key {
        return init_tracing_with_otel(config, key);
    }

    init_tracing(config)?;

    #[cfg(not(feature = "telemetry"))]
    if config.tracing_enabled() {
        tracing::warn!("built without the telemetry feature; trace key only enables request spans");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_follows_key_presence() {
        assert!(!TracingConfig::default().tracing_enabled());

        let config = TracingConfig {
            debug: false,
            trace_key: Some("abc".into()),
        };
        assert!(config.tracing_enabled());
    }
}

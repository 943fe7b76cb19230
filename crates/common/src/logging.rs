use std::env;

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use thiserror::Error;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const OTLP_URL_ENVVAR: &str = "ROLLUP_OTLP_URL";
pub const SVC_LABEL_ENVVAR: &str = "ROLLUP_SVC_LABEL";

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("opentelemetry: {0}")]
    Otel(#[from] opentelemetry::trace::TraceError),

    #[error("subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Clone, Debug)]
pub struct LoggerConfig {
    whoami: String,
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a new empty instance with whoami set.
    pub fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
        }
    }

    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    /// Like [`Self::with_base_name`], also picking up the OTLP URL from the
    /// environment if it's set.
    pub fn from_env(base: &str) -> Self {
        let mut config = Self::with_base_name(base);
        if let Some(url) = get_otlp_url_from_env() {
            config.set_otlp_url(url);
        }
        config
    }

    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }

    pub fn whoami(&self) -> &str {
        &self.whoami
    }

    pub fn otlp_url(&self) -> Option<&str> {
        self.otel_url.as_deref()
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(rollup-service)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Must be called from within a tokio runtime if an OTLP URL is set.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filt =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Stdout logging.
    let stdout_sub = tracing_subscriber::fmt::layer().compact().with_filter(filt);

    // OpenTelemetry output.
    if let Some(otel_url) = &config.otel_url {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(otel_url);

        let tp = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;

        let tt = tp.tracer("rollup-log");
        opentelemetry::global::set_tracer_provider(tp);

        let otel_sub = tracing_opentelemetry::layer().with_tracer(tt);

        tracing_subscriber::registry()
            .with(stdout_sub)
            .with(otel_sub)
            .try_init()?;
    } else {
        tracing_subscriber::registry().with(stdout_sub).try_init()?;
    }

    info!(whoami = %config.whoami, "logging started");
    Ok(())
}

/// Shuts down the logging subsystem, flushing any spans still buffered for
/// export.
pub fn finalize() {
    info!("shutting down logging");
    opentelemetry::global::shutdown_tracer_provider();
}

/// Gets the OTLP URL from the standard envvar.
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    whoami_with_label(base, get_service_label_from_env().as_deref())
}

fn whoami_with_label(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whoami_label() {
        assert_eq!(whoami_with_label("prover", None), "prover");
        assert_eq!(whoami_with_label("prover", Some("a")), "prover%a");
    }

    #[test]
    fn test_config_otlp_url() {
        let mut config = LoggerConfig::new("prover".to_owned());
        assert_eq!(config.otlp_url(), None);
        config.set_otlp_url("http://localhost:4317".to_owned());
        assert_eq!(config.otlp_url(), Some("http://localhost:4317"));
        assert_eq!(config.whoami(), "prover");
    }
}

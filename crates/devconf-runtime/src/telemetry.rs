//! Tracing initialisation for devconf processes.
//!
//! Call [`init_tracing`] once at process startup.  The returned guard owns
//! the optional OpenTelemetry provider and hands out a [`LogLevelHandle`]
//! so that an applied `common_settings.log_level` can change the active
//! filter while the process runs.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL.  When set the OTLP HTTP exporter is activated. |
//! | `RUST_LOG` | Initial log filter (default `"warn"`). |
//! | `DEVCONF_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Example
//!
//! ```rust,no_run
//! let guard = devconf_runtime::telemetry::init_tracing("devconf", false);
//! let levels = guard.log_level();
//! ```

use devconf_types::LogLevel;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::RuntimeError;

const DEFAULT_FILTER: &str = "warn";

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// JSON output is used when `json` is set or `DEVCONF_LOG_FORMAT=json`.
/// Hold the returned guard for the lifetime of the process; dropping it
/// flushes pending spans.
pub fn init_tracing(service_name: &str, json: bool) -> TracerProviderGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (filter, handle) = reload::Layer::new(env_filter);
    let use_json = json || std::env::var("DEVCONF_LOG_FORMAT").as_deref() == Ok("json");

    let provider = build_provider(service_name);

    if let Some(ref p) = provider {
        let tracer = p.tracer("devconf");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        if use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(otel_layer)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(otel_layer)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    } else if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }

    TracerProviderGuard {
        provider,
        log_level: LogLevelHandle::attached(handle),
    }
}

/// Changes the active log filter at run time.
#[derive(Clone)]
pub struct LogLevelHandle {
    inner: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogLevelHandle {
    /// A handle not connected to any subscriber; level changes are no-ops.
    pub fn detached() -> Self {
        Self { inner: None }
    }

    pub(crate) fn attached(handle: reload::Handle<EnvFilter, Registry>) -> Self {
        Self {
            inner: Some(handle),
        }
    }

    /// Replace the active filter with one for `level`.
    pub fn set_level(&self, level: LogLevel) -> Result<(), RuntimeError> {
        let directive = level.as_filter_directive();
        let Some(handle) = &self.inner else {
            tracing::debug!(directive, "log level change without subscriber");
            return Ok(());
        };
        handle
            .reload(EnvFilter::new(directive))
            .map_err(|e| RuntimeError::Telemetry(e.to_string()))?;
        tracing::info!(directive, "log level changed");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// Shuts down the OTel [`SdkTracerProvider`] on drop.
pub struct TracerProviderGuard {
    provider: Option<SdkTracerProvider>,
    log_level: LogLevelHandle,
}

impl TracerProviderGuard {
    pub fn log_level(&self) -> LogLevelHandle {
        self.log_level.clone()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[devconf] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Build an [`SdkTracerProvider`] when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[devconf] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // No async runtime exists in devconf processes.
            .with_simple_exporter(exporter)
            .build(),
    )
}

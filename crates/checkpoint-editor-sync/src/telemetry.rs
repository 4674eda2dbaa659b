//! Console tracing and Prometheus metrics for hosts embedding edit sessions.
//!
//! Sessions always emit `tracing` events and `metrics` counters; nothing is
//! recorded or printed until a host installs a subscriber and a recorder.
//!
//! ```ignore
//! use checkpoint_editor_sync::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("checkpoint-editor"))?;
//! // ... later, from a /metrics handler:
//! let body = telemetry::render();
//! ```

use std::sync::OnceLock;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static RECORDER_INSTALL: Mutex<()> = parking_lot::const_mutex(());

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line.
    pub service_name: String,
    /// Console level when `RUST_LOG` is unset (DEBUG in debug builds).
    pub console_level: Level,
}

impl TelemetryConfig {
    /// `RUST_LOG`, when set, overrides `console_level`.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        Self {
            service_name: service_name.into(),
            console_level,
        }
    }
}

/// Install the metrics recorder and the console subscriber.
pub fn init(config: TelemetryConfig) -> Result<(), BuildError> {
    init_metrics()?;
    init_tracing(&config);
    Ok(())
}

/// Install the Prometheus recorder, once per process. Concurrent callers
/// all receive the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let _install = RECORDER_INSTALL.lock();
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

fn init_tracing(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    // A host that already installed a subscriber keeps it.
    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(service = %config.service_name, "telemetry initialized");
    }
}

/// Render metrics in Prometheus text format, or an empty string before
/// [`init_metrics`] has run.
pub fn render() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

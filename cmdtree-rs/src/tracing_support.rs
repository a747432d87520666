//! Tracing and logging support.
//!
//! The dispatcher emits `tracing` events everywhere; this module only wires up
//! a subscriber for binaries that want one. It is compiled with the `tracing`
//! feature (on by default).

#[cfg(feature = "tracing")]
use serde::Deserialize;

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer, Registry,
};

/// Tracing output format.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TracingFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,

    /// One line per event.
    Compact,

    /// Newline-delimited JSON.
    Json,
}

/// Tracing configuration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directive such as `"debug"` or `"cmdtree=trace"`.
    ///
    /// If None, uses RUST_LOG or defaults to "info".
    pub level: Option<String>,

    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    /// Include thread IDs in output.
    pub thread_ids: bool,
}

#[cfg(feature = "tracing")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        match &self.level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }
}

/// Initialize a subscriber with default settings.
///
/// Uses RUST_LOG for level filtering and defaults to "info" if unset.
/// Fails if a global subscriber is already installed.
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - Enable debug logs
/// - `RUST_LOG=cmdtree=trace` - Trace candidate rejection during parsing
#[cfg(feature = "tracing")]
pub fn init_subscriber() -> Result<(), TryInitError> {
    init_subscriber_with_config(TracingConfig::default())
}

/// Initialize a subscriber with custom configuration.
///
/// # Example
///
/// ```ignore
/// use cmdtree::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// let config = TracingConfig {
///     format: TracingFormat::Json,
///     timestamps: false,
///     ..Default::default()
/// };
/// init_subscriber_with_config(config).ok();
/// ```
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt_layer(&config))
        .with(config.filter())
        .try_init()
}

#[cfg(feature = "tracing")]
fn fmt_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.target)
        .with_thread_ids(config.thread_ids);

    match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingFormat::Compact, true) => layer.compact().boxed(),
        (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingFormat::Json, true) => layer.json().boxed(),
        (TracingFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

// Fallback when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() -> Result<(), std::convert::Infallible> {
    Ok(())
}

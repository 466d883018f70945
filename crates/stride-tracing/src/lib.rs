//! Shared tracing configuration for the stride workspace.
//!
//! Tests, benches and embedding hosts install their `tracing` subscriber
//! through this crate so every consumer of the array runtime gets the same
//! filtering and output format.
//!
//! ```no_run
//! use stride_tracing::{init_global_tracing, TracingConfig};
//!
//! init_global_tracing(&TracingConfig::from_env()).expect("subscriber already installed");
//! ```

pub mod performance;

#[macro_use]
pub mod macros;

use std::env;
pub use tracing::{debug, error, info, trace, warn};

#[doc(hidden)]
pub use tracing as __tracing;

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

/// Crates whose spans the performance profile turns up to `debug`.
const PERFORMANCE_DIRECTIVES: &str = "stride_memory=debug,stride_core=debug";

/// Formatting layer boxed so every output format has one type.
pub type BoxedFmtLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Named presets selectable through `STRIDE_TRACING_PROFILE`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracingProfile {
    /// Pretty, coloured output; performance spans on in debug builds
    #[default]
    Local,
    /// JSON without colour
    Ci,
    /// JSON with span lifecycle events and debug level for the runtime crates
    Performance,
}

impl TracingProfile {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "ci" => Some(Self::Ci),
            "performance" | "perf" => Some(Self::Performance),
            _ => None,
        }
    }
}

/// Configuration describing how the shared tracing subscriber should behave.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Filter directives such as `stride_core=debug,info`. `None` defers to
    /// `RUST_LOG`, then to `default_directive`.
    pub directives: Option<String>,
    pub default_directive: String,
    /// Show event targets (module paths)
    pub include_targets: bool,
    pub ansi: bool,
    /// Span lifecycle events to emit
    pub span_events: FmtSpan,
    pub output: TracingOutput,
    /// When false, performance spans still time but never log.
    pub enable_performance_tracing: bool,
    /// Minimum duration for a performance span to be logged; `None` logs all.
    pub performance_threshold_us: Option<u64>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_profile(TracingProfile::default())
    }
}

impl TracingConfig {
    pub fn for_profile(profile: TracingProfile) -> Self {
        let (output, span_events, directives) = match profile {
            TracingProfile::Local => (TracingOutput::Pretty, FmtSpan::NONE, None),
            TracingProfile::Ci => (TracingOutput::Json, FmtSpan::NONE, None),
            TracingProfile::Performance => (
                TracingOutput::Json,
                FmtSpan::ENTER | FmtSpan::EXIT | FmtSpan::CLOSE,
                Some(PERFORMANCE_DIRECTIVES.to_string()),
            ),
        };

        Self {
            directives,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: output != TracingOutput::Json,
            span_events,
            output,
            enable_performance_tracing: match profile {
                TracingProfile::Local => cfg!(debug_assertions),
                TracingProfile::Ci => false,
                TracingProfile::Performance => true,
            },
            performance_threshold_us: None,
        }
    }

    pub fn for_local() -> Self {
        Self::for_profile(TracingProfile::Local)
    }

    pub fn for_ci() -> Self {
        Self::for_profile(TracingProfile::Ci)
    }

    pub fn for_performance() -> Self {
        Self::for_profile(TracingProfile::Performance)
    }

    /// Start from the profile named in the environment, then apply overrides.
    ///
    /// # Environment Variables
    ///
    /// - `STRIDE_TRACING_PROFILE` - `local` (default), `ci` or `performance`
    /// - `STRIDE_TRACING_DIRECTIVES` - filter directives
    /// - `STRIDE_TRACING_FORMAT` - `pretty`, `compact` or `json`
    /// - `STRIDE_PERF_TRACING` - `true`, `1` or `yes` turn performance spans on
    /// - `STRIDE_PERF_THRESHOLD_US` - minimum span duration to log
    ///
    /// Unrecognised values are ignored.
    pub fn from_env() -> Self {
        let profile = env_value("STRIDE_TRACING_PROFILE")
            .and_then(|value| TracingProfile::from_env_value(&value))
            .unwrap_or_default();
        let mut config = Self::for_profile(profile);

        if let Some(directives) = env_value("STRIDE_TRACING_DIRECTIVES") {
            config.directives = Some(directives);
        }

        if let Some(output) = env_value("STRIDE_TRACING_FORMAT").and_then(|v| TracingOutput::from_env_value(&v)) {
            config.ansi &= output != TracingOutput::Json;
            config.output = output;
        }

        if let Some(flag) = env_value("STRIDE_PERF_TRACING") {
            config.enable_performance_tracing = matches!(flag.to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }

        if let Some(threshold) = env_value("STRIDE_PERF_THRESHOLD_US").and_then(|v| v.parse().ok()) {
            config.performance_threshold_us = Some(threshold);
        }

        config
    }

    fn resolve_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter(err.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))),
        }
    }

    fn fmt_layer(&self) -> BoxedFmtLayer {
        let base = tracing_fmt::layer()
            .with_target(self.include_targets)
            .with_span_events(self.span_events.clone());

        match self.output {
            TracingOutput::Compact => base.compact().with_ansi(self.ansi).boxed(),
            TracingOutput::Pretty => base.pretty().with_ansi(self.ansi).boxed(),
            TracingOutput::Json => base.json().with_ansi(false).boxed(),
        }
    }
}

/// Trimmed, non-empty value of an environment variable
fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Errors surfaced when configuring the shared tracing subscriber fails.
#[derive(Debug, thiserror::Error)]
pub enum TracingSetupError {
    #[error("invalid tracing directive: {0}")]
    InvalidFilter(String),

    /// Usually means a global subscriber is already installed
    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Build a `tracing` subscriber using the provided configuration.
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let (filter, fmt_layer) = subscriber_layers(config)?;
    Ok(Registry::default().with(fmt_layer).with(filter))
}

/// Filter and formatting layers, for hosts composing their own subscriber.
pub fn subscriber_layers(config: &TracingConfig) -> Result<(EnvFilter, BoxedFmtLayer), TracingSetupError> {
    Ok((config.resolve_filter()?, config.fmt_layer()))
}

/// Install the configured subscriber as the process-wide default and apply
/// its performance settings.
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    build_subscriber(config)?.try_init()?;
    performance::configure(config.enable_performance_tracing, config.performance_threshold_us);
    tracing::debug!(output = ?config.output, directives = ?config.directives, "tracing initialised");
    Ok(())
}

/// Output format of the formatting layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl TracingOutput {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

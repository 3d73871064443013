//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; binaries call [`init`] once.
//! Output goes to stderr so command results on stdout stay machine readable.
//!
//! # Example
//! ```no_run
//! use daq_scpi::logging::{self, LogFormat, TracingConfig};
//! use tracing::Level;
//!
//! logging::init(TracingConfig::new(Level::DEBUG).with_format(LogFormat::Json))?;
//! tracing::info!(resource = "/dev/ttyUSB0", "connecting");
//! # Ok::<(), daq_scpi::error::ScpiError>(())
//! ```

use crate::error::{ScpiError, ScpiResult};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored (interactive use)
    Pretty,
    /// One line per event, no colors
    #[default]
    Compact,
    /// One JSON object per event (log collectors)
    Json,
}

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Output format
    pub format: LogFormat,
    /// Emit span open/close events
    pub with_span_events: bool,
    /// Include source file and line
    pub with_file_and_line: bool,
    /// Enable ANSI colors (pretty format only)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_span_events: false,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Config with the given default level.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Config from a level name as found in the settings file.
    pub fn from_level_name(level: &str) -> ScpiResult<Self> {
        Ok(Self::new(parse_log_level(level)?))
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable span events.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Install the global subscriber.
///
/// Calling it again after a subscriber is installed is not an error, so
/// tests and embedding applications can call it freely.
pub fn init(config: TracingConfig) -> ScpiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_ascii_lowercase()));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.with_file_and_line)
        .with_line_number(config.with_file_and_line);

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(base.pretty().with_ansi(config.with_ansi).with_filter(env_filter))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(base.compact().with_ansi(false).with_filter(env_filter))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(base.json().with_filter(env_filter))
            .try_init(),
    };
    result.or_else(already_installed)
}

fn already_installed(e: TryInitError) -> ScpiResult<()> {
    let message = e.to_string();
    if message.contains("already been set") || message.contains("already initialized") {
        Ok(())
    } else {
        Err(ScpiError::Configuration(format!(
            "Failed to initialize tracing: {}",
            message
        )))
    }
}

/// Parse a level name, case-insensitively.
pub fn parse_log_level(level: &str) -> ScpiResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ScpiError::Configuration(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        ))),
    }
}

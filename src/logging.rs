//! Tracing subscriber setup for the `storefront` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Output goes to stderr so the interactive shell keeps stdout
//! for shopper-facing messages.

use serde::Deserialize;
use std::fmt;
use std::io;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    Layer, Registry,
    filter::EnvFilter,
    fmt::{self as tfmt, format::FmtSpan},
    prelude::*,
};

/// Logging format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// JSON lines for log aggregation
    Json,
    /// Single-line output
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!(
                "unknown log format '{other}', expected pretty, json or compact"
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Minimum level when `RUST_LOG` is unset
    pub level: Level,
    /// Emit span open/close events
    pub with_spans: bool,
    /// Include the module path
    pub with_target: bool,
    /// Include file and line
    pub with_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            level: Level::WARN,
            with_spans: false,
            with_target: true,
            with_file: false,
        }
    }
}

impl LogConfig {
    /// Verbose output for troubleshooting (`--verbose`).
    pub const fn development() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: Level::DEBUG,
            with_spans: false,
            with_target: true,
            with_file: true,
        }
    }

    #[must_use]
    pub const fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Parses a level name (`trace`..`error`, case-insensitive).
pub fn parse_level(name: &str) -> Result<Level, String> {
    Level::from_str(name).map_err(|_| format!("unknown log level '{name}'"))
}

/// Installs the global subscriber. Respects `RUST_LOG` when set.
///
/// Calling it twice is harmless: the second install is ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let _ = tracing_subscriber::registry()
        .with(output_layer(config).with_filter(filter))
        .try_init();
}

/// The stderr formatting layer for `config`, shared by every format.
fn output_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tfmt::layer()
        .with_writer(io::stderr)
        .with_target(config.with_target)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_span_events(span_events);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

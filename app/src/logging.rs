//! Logging pipeline: compact or JSON lines on stderr, filtered by an
//! `EnvFilter` directive.
//!
//! - `SUI_LOG_LEVEL`: filter directive, default `info`
//! - `SUI_LOG_FORMAT`: `compact` (default) or `json`
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use anyhow::Result;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGING_CONFIG: OnceLock<LoggingConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let format = match get("SUI_LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        let level = get("SUI_LOG_LEVEL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        Self { format, level }
    }

    /// `--verbose` raises the default directive to `debug`.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose && self.level == "info" {
            self.level = "debug".to_string();
        }
        self
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    if LOGGING_CONFIG.set(config.clone()).is_err() {
        return Ok(());
    }
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow::anyhow!("invalid SUI_LOG_LEVEL {:?}: {e}", config.level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;
    tracing::debug!(format = ?config.format, level = %config.level, "logging initialized");
    Ok(())
}

/// Configuration the pipeline was initialized with, if any.
pub fn current() -> Option<&'static LoggingConfig> {
    LOGGING_CONFIG.get()
}

//! Logging Module
//!
//! Structured logging built on `tracing`. Both the `iris` CLI and the
//! prediction server initialise their subscriber through [`init_logging`].

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::utils::error::{IrisError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display (overridden by `RUST_LOG` when set)
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Create a verbose logging config for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            include_thread_ids: true,
            ansi_colors: true,
        }
    }

    /// Create a production logging config for the long-running server
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: true,
            include_thread_ids: false,
            ansi_colors: false,
        }
    }

    /// Pick the verbose or default config from a CLI flag
    pub fn from_verbose_flag(verbose: bool) -> Self {
        if verbose {
            Self::verbose()
        } else {
            Self::default()
        }
    }

    /// Override the level when one was given on the command line
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        self
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Directive string understood by `EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_tracing_level())
    }
}

/// Build the filter for a config: `RUST_LOG` wins, the configured level is the fallback
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()))
}

/// Initialize logging with the given configuration
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .compact()
        .try_init()
        .map_err(|e| IrisError::Config(format!("Failed to initialize logging: {e}")))
}

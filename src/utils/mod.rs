//! Utilities module for logging, metrics, and helper functions
//!
//! This module provides:
//! - Structured logging with tracing
//! - Metrics computation (accuracy, weighted F1-score, confusion matrix)
//! - Error handling types

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{IrisError, Result};
pub use logging::{init_logging, LogConfig, LogLevel};
pub use metrics::{ClassMetrics, ConfusionMatrix, Metrics};

/// Format a fraction in [0, 1] as a percentage
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

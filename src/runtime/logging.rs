// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured logging for appliance operations.
//!
//! An [`OperationLogger`] is created by the caller and handed to each
//! resource wrapper, so log levels and counters are scoped to whoever owns
//! the logger rather than to process-wide state. Events are emitted through
//! `tracing` under the `isam_api::ops` target.
//!
//! # Example
//!
//! ```
//! use isam_api_rs::runtime::{LogLevel, LoggingConfig, OperationLogger};
//! use isam_api_rs::Envelope;
//!
//! let logger = OperationLogger::with_config(
//!     LoggingConfig::new().with_success_level(LogLevel::Debug),
//! );
//!
//! let span = logger.start("Clear a log file");
//! logger.finish(span, &Envelope::new().with_changed(true));
//! assert_eq!(logger.metrics().changed(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::envelope::Envelope;
use crate::error::IsamError;

const TARGET: &str = "isam_api::ops";

/// Log level for operation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level - only errors.
    Error,
    /// Disabled - no logging.
    Off,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

fn emit(level: LogLevel, msg: &str) {
    match level {
        LogLevel::Trace => trace!(target: TARGET, "{}", msg),
        LogLevel::Debug => debug!(target: TARGET, "{}", msg),
        LogLevel::Info => info!(target: TARGET, "{}", msg),
        LogLevel::Warn => warn!(target: TARGET, "{}", msg),
        LogLevel::Error => error!(target: TARGET, "{}", msg),
        LogLevel::Off => {}
    }
}

/// Configuration for an [`OperationLogger`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for completed operations.
    pub success_level: LogLevel,
    /// Level for failed operations.
    pub error_level: LogLevel,
    /// Level for skip decisions (unsupported deployment, no change needed).
    pub decision_level: LogLevel,
    /// Whether envelope warnings are logged individually.
    pub log_warnings: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            success_level: LogLevel::Info,
            error_level: LogLevel::Error,
            decision_level: LogLevel::Debug,
            log_warnings: true,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success log level.
    #[must_use]
    pub fn with_success_level(mut self, level: LogLevel) -> Self {
        self.success_level = level;
        self
    }

    /// Set the error log level.
    #[must_use]
    pub fn with_error_level(mut self, level: LogLevel) -> Self {
        self.error_level = level;
        self
    }

    /// Set the decision log level.
    #[must_use]
    pub fn with_decision_level(mut self, level: LogLevel) -> Self {
        self.decision_level = level;
        self
    }

    /// Enable or disable per-warning logging.
    #[must_use]
    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.log_warnings = enabled;
        self
    }

    /// Create a verbose configuration for debugging.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            success_level: LogLevel::Debug,
            error_level: LogLevel::Error,
            decision_level: LogLevel::Debug,
            log_warnings: true,
        }
    }

    /// Create a quiet configuration: failures only.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            success_level: LogLevel::Off,
            error_level: LogLevel::Warn,
            decision_level: LogLevel::Off,
            log_warnings: false,
        }
    }
}

/// Outcome counters kept by an [`OperationLogger`].
#[derive(Debug, Default)]
pub struct OperationMetrics {
    changed: AtomicU64,
    unchanged: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl OperationMetrics {
    /// Create a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations that changed (or would change) the appliance.
    #[must_use]
    pub fn changed(&self) -> u64 {
        self.changed.load(Ordering::Relaxed)
    }

    /// Operations that completed without a change.
    #[must_use]
    pub fn unchanged(&self) -> u64 {
        self.unchanged.load(Ordering::Relaxed)
    }

    /// Operations skipped because the deployment does not support them.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Operations that returned an error.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// All recorded operations.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.changed() + self.unchanged() + self.skipped() + self.failed()
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.changed.store(0, Ordering::Relaxed);
        self.unchanged.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }

    fn record(&self, envelope: &Envelope) {
        let counter = if envelope.is_unsupported() {
            &self.skipped
        } else if envelope.changed {
            &self.changed
        } else {
            &self.unchanged
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Logs the lifecycle of appliance operations and counts their outcomes.
#[derive(Debug, Default)]
pub struct OperationLogger {
    config: LoggingConfig,
    metrics: OperationMetrics,
}

impl OperationLogger {
    /// Create a logger with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logger with custom configuration.
    #[must_use]
    pub fn with_config(config: LoggingConfig) -> Self {
        Self {
            config,
            metrics: OperationMetrics::new(),
        }
    }

    /// A logger that emits nothing but still counts outcomes.
    #[must_use]
    pub fn silent() -> Self {
        Self::with_config(LoggingConfig {
            success_level: LogLevel::Off,
            error_level: LogLevel::Off,
            decision_level: LogLevel::Off,
            log_warnings: false,
        })
    }

    #[must_use]
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &OperationMetrics {
        &self.metrics
    }

    /// Start tracking an operation.
    #[must_use]
    pub fn start(&self, description: &str) -> OperationSpan {
        emit(self.config.decision_level, &format!("{description}: started"));
        OperationSpan {
            description: description.to_string(),
            start: Instant::now(),
        }
    }

    /// Record why an operation took the path it did.
    pub fn decision(&self, span: &OperationSpan, detail: impl fmt::Display) {
        emit(
            self.config.decision_level,
            &format!("{}: {}", span.description, detail),
        );
    }

    /// Finish tracking an operation that produced an envelope.
    pub fn finish(&self, span: OperationSpan, envelope: &Envelope) {
        self.metrics.record(envelope);
        let elapsed = span.start.elapsed();

        let outcome = if envelope.is_unsupported() {
            "skipped (unsupported deployment)"
        } else if envelope.changed {
            "changed"
        } else {
            "unchanged"
        };
        emit(
            self.config.success_level,
            &format!("{}: {} in {:?}", span.description, outcome, elapsed),
        );

        if self.config.log_warnings && self.config.success_level != LogLevel::Off {
            for warning in &envelope.warnings {
                warn!(target: TARGET, operation = %span.description, "{}", warning);
            }
        }
    }

    /// Finish tracking an operation with whatever it returned.
    pub fn finish_result(&self, span: OperationSpan, result: &Result<Envelope, IsamError>) {
        match result {
            Ok(envelope) => self.finish(span, envelope),
            Err(err) => self.finish_error(span, err),
        }
    }

    /// Finish tracking an operation that failed.
    pub fn finish_error(&self, span: OperationSpan, error: &IsamError) {
        self.metrics.failed.fetch_add(1, Ordering::Relaxed);
        let elapsed = span.start.elapsed();
        emit(
            self.config.error_level,
            &format!("{}: failed in {:?}: {}", span.description, elapsed, error),
        );
    }
}

/// An in-flight operation.
#[derive(Debug)]
pub struct OperationSpan {
    description: String,
    start: Instant,
}

impl OperationSpan {
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Time since the operation started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "TRACE");
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
        assert_eq!(LogLevel::Info.to_string(), "INFO");
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
        assert_eq!(LogLevel::Off.to_string(), "OFF");
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_success_level(LogLevel::Debug)
            .with_error_level(LogLevel::Warn)
            .with_decision_level(LogLevel::Trace)
            .with_warnings(false);

        assert_eq!(config.success_level, LogLevel::Debug);
        assert_eq!(config.error_level, LogLevel::Warn);
        assert_eq!(config.decision_level, LogLevel::Trace);
        assert!(!config.log_warnings);
    }

    #[test]
    fn test_logging_config_presets() {
        assert_eq!(LoggingConfig::verbose().success_level, LogLevel::Debug);
        let quiet = LoggingConfig::quiet();
        assert_eq!(quiet.success_level, LogLevel::Off);
        assert_eq!(quiet.error_level, LogLevel::Warn);
    }

    #[test]
    fn test_outcomes_are_counted() {
        let logger = OperationLogger::silent();

        logger.finish(logger.start("a"), &Envelope::new().with_changed(true));
        logger.finish(logger.start("b"), &Envelope::new());
        logger.finish(logger.start("c"), &Envelope::unsupported("docker"));
        logger.finish_error(logger.start("d"), &IsamError::Transport("down".into()));

        let m = logger.metrics();
        assert_eq!(m.changed(), 1);
        assert_eq!(m.unchanged(), 1);
        assert_eq!(m.skipped(), 1);
        assert_eq!(m.failed(), 1);
        assert_eq!(m.total(), 4);

        m.reset();
        assert_eq!(m.total(), 0);
    }

    #[test]
    fn test_loggers_do_not_share_counters() {
        let first = OperationLogger::silent();
        let second = OperationLogger::silent();
        first.finish(first.start("a"), &Envelope::new());
        assert_eq!(first.metrics().total(), 1);
        assert_eq!(second.metrics().total(), 0);
    }

    #[test]
    fn test_span() {
        let logger = OperationLogger::new();
        let span = logger.start("Export a cluster manager log file");
        assert_eq!(span.description(), "Export a cluster manager log file");
        assert!(span.elapsed() < std::time::Duration::from_secs(1));
    }
}

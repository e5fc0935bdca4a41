// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime utilities for observability.
//!
//! Logging is injected: callers build an [`OperationLogger`] and pass it to
//! the resource wrappers they use.

mod logging;

pub use logging::{LogLevel, LoggingConfig, OperationLogger, OperationMetrics, OperationSpan};

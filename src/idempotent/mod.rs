// SPDX-License-Identifier: MIT OR Apache-2.0

//! The idempotent-mutation protocol shared by every resource wrapper.
//!
//! A mutating operation reads the current remote state, stops early when
//! the deployment does not support the API, compares what it observed with
//! the target, and then either reports a planned change (check mode),
//! performs the change, or does nothing. [`decide`] holds that logic as a
//! pure function; [`mutate_if_needed`], [`export_if_needed`] and
//! [`test_configuration`] drive it against an appliance.
//!
//! # Example
//!
//! ```
//! use isam_api_rs::idempotent::{decide, Decision, OperationOptions};
//! use isam_api_rs::envelope::EnvironmentSupport;
//!
//! let options = OperationOptions::new().check_mode(true);
//! let decision = decide(&EnvironmentSupport::Supported, &options, true);
//! assert_eq!(decision, Decision::WouldChange);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::Path;

use crate::envelope::{EnvironmentSupport, Envelope};
use crate::error::Result;
use crate::runtime::OperationLogger;

/// Warning returned when a diagnostic finds nothing to test.
pub const NO_VALID_CONFIGURATION: &str = "Valid configuration not found, test skipped.";

/// Per-call flags for mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationOptions {
    /// Report what would change without changing anything. Default `false`.
    #[serde(default)]
    pub check_mode: bool,
    /// Skip the state comparison and always mutate. Default `false`.
    #[serde(default)]
    pub force: bool,
}

impl OperationOptions {
    /// Options with both flags off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set check mode.
    #[must_use]
    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Set force.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// What a mutating operation will do after reading current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The deployment does not support the API; nothing is attempted.
    Unsupported(String),
    /// Already at the target state.
    NoChange,
    /// A change is needed but check mode is on.
    WouldChange,
    /// Perform the mutating call.
    Apply,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Unsupported(reason) => write!(f, "unsupported: {reason}"),
            Decision::NoChange => write!(f, "already at target state"),
            Decision::WouldChange => write!(f, "change needed (check mode, not applied)"),
            Decision::Apply => write!(f, "change needed, applying"),
        }
    }
}

/// Decide what a mutating operation does.
///
/// `differs` is whether the observed state differs from the target. An
/// unsupported deployment wins over `force` and `check_mode`.
#[must_use]
pub fn decide(support: &EnvironmentSupport, options: &OperationOptions, differs: bool) -> Decision {
    if let EnvironmentSupport::Unsupported(reason) = support {
        return Decision::Unsupported(reason.clone());
    }
    if !(options.force || differs) {
        return Decision::NoChange;
    }
    if options.check_mode {
        Decision::WouldChange
    } else {
        Decision::Apply
    }
}

/// Describes a mutating operation to [`mutate_if_needed`].
#[derive(Debug, Clone)]
pub struct Intent<'a> {
    /// Human-readable name of the operation, used in logs.
    pub description: &'a str,
    pub options: OperationOptions,
    /// Warnings to report with a planned or applied change in place of the
    /// read's warnings.
    pub notice: Option<Vec<String>>,
}

impl<'a> Intent<'a> {
    #[must_use]
    pub fn new(description: &'a str, options: OperationOptions) -> Self {
        Self {
            description,
            options,
            notice: None,
        }
    }

    #[must_use]
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice.get_or_insert_with(Vec::new).push(notice.into());
        self
    }
}

/// An unchanged envelope that keeps the read's warnings and support flag.
fn carry_forward(current: Envelope) -> Envelope {
    Envelope {
        changed: false,
        warnings: current.warnings,
        support: current.support,
        ..Envelope::default()
    }
}

/// Run a read-only call under the logger.
///
/// # Errors
///
/// Propagates the error from `read`.
pub async fn observe<R>(logger: &OperationLogger, description: &str, read: R) -> Result<Envelope>
where
    R: Future<Output = Result<Envelope>>,
{
    let span = logger.start(description);
    let result = read.await;
    logger.finish_result(span, &result);
    result
}

/// Read, compare, and mutate only when needed.
///
/// `at_target` is only consulted when the deployment supports the API.
/// `mutate` receives the warnings the change should carry and its envelope
/// is returned verbatim.
///
/// # Errors
///
/// Propagates errors from `read` and `mutate` unchanged.
pub async fn mutate_if_needed<R, T, F, Fut>(
    logger: &OperationLogger,
    intent: Intent<'_>,
    read: R,
    at_target: T,
    mutate: F,
) -> Result<Envelope>
where
    R: Future<Output = Result<Envelope>>,
    T: FnOnce(&Envelope) -> bool,
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Envelope>>,
{
    let span = logger.start(intent.description);
    let result = async {
        let current = read.await?;
        let differs = !current.is_unsupported() && !at_target(&current);
        let decision = decide(&current.support, &intent.options, differs);
        logger.decision(&span, &decision);

        match decision {
            Decision::Unsupported(_) | Decision::NoChange => Ok(carry_forward(current)),
            Decision::WouldChange => Ok(Envelope::planned_change(
                intent.notice.unwrap_or(current.warnings),
            )),
            Decision::Apply => mutate(intent.notice.unwrap_or(current.warnings)).await,
        }
    }
    .await;
    logger.finish_result(span, &result);
    result
}

/// Download to `destination` unless it already exists.
///
/// The local file's presence stands in for the remote state comparison.
/// Check mode neither downloads nor inspects the destination, and `force`
/// skips the existence check.
///
/// # Errors
///
/// Returns an I/O error if the destination's existence cannot be determined,
/// and propagates errors from `download`.
pub async fn export_if_needed<F, Fut>(
    logger: &OperationLogger,
    description: &str,
    destination: &Path,
    options: OperationOptions,
    download: F,
) -> Result<Envelope>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope>>,
{
    let span = logger.start(description);
    let result = async {
        if options.check_mode {
            logger.decision(&span, "check mode, export skipped");
            return Ok(Envelope::new());
        }
        if !options.force && tokio::fs::try_exists(destination).await? {
            logger.decision(
                &span,
                format_args!("{} exists, export skipped", destination.display()),
            );
            return Ok(Envelope::new());
        }
        download().await
    }
    .await;
    logger.finish_result(span, &result);
    result
}

/// Run a non-mutating diagnostic against a configured resource.
///
/// The result is never reported as a change, whatever the client says.
///
/// # Errors
///
/// Propagates errors from `read` and `test`.
pub async fn test_configuration<R, C, F, Fut>(
    logger: &OperationLogger,
    description: &str,
    read: R,
    is_configured: C,
    test: F,
) -> Result<Envelope>
where
    R: Future<Output = Result<Envelope>>,
    C: FnOnce(&Envelope) -> bool,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope>>,
{
    let span = logger.start(description);
    let result = async {
        let current = read.await?;
        if current.is_unsupported() {
            logger.decision(&span, "unsupported deployment, test skipped");
            return Ok(carry_forward(current));
        }
        if !is_configured(&current) {
            logger.decision(&span, NO_VALID_CONFIGURATION);
            return Ok(Envelope::unchanged(vec![NO_VALID_CONFIGURATION.to_string()]));
        }
        test().await.map(|envelope| envelope.with_changed(false))
    }
    .await;
    logger.finish_result(span, &result);
    result
}

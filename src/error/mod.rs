// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::client::CapabilityError;

#[derive(Debug, Error)]
pub enum IsamError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability check failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("API request failed ({status}): {message}")]
    Api { status: http::StatusCode, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl IsamError {
    /// Whether an `ignore_error` call may fold this failure into a warning.
    ///
    /// Capability and local I/O failures are never suppressed.
    #[must_use]
    pub fn is_suppressible(&self) -> bool {
        matches!(self, IsamError::Api { .. } | IsamError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, IsamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = IsamError::Api {
            status: http::StatusCode::BAD_REQUEST,
            message: "invalid passcode".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API request failed (400 Bad Request): invalid passcode"
        );
    }

    #[test]
    fn test_suppressible() {
        assert!(IsamError::Transport("reset by peer".into()).is_suppressible());
        assert!(!IsamError::Validation("bad".into()).is_suppressible());
        let cap = IsamError::from(CapabilityError::MissingModules {
            missing: vec!["wga".into()],
        });
        assert!(!cap.is_suppressible());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability requirements checked before an API call is dispatched.
//!
//! Every appliance endpoint is only available on some deployment models,
//! with some feature modules activated, and from some firmware version on.
//! A client compares an operation's [`Requirements`] against the
//! [`ApplianceFacts`] of the connected appliance before sending anything.
//!
//! # Example
//!
//! ```
//! use isam_api_rs::client::{ApplianceFacts, DeploymentModel, Requirements};
//! use isam_api_rs::envelope::EnvironmentSupport;
//!
//! let facts = ApplianceFacts::new(DeploymentModel::Appliance, "10.0.6.0".parse().unwrap())
//!     .with_module("wga");
//! let requires = Requirements::model(DeploymentModel::Appliance).with_module("wga");
//!
//! assert_eq!(requires.check(&facts).unwrap(), EnvironmentSupport::Supported);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::envelope::EnvironmentSupport;

/// How the appliance is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeploymentModel {
    /// Hardware or virtual appliance.
    #[default]
    Appliance,
    /// Container deployment.
    Docker,
}

impl fmt::Display for DeploymentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentModel::Appliance => write!(f, "Appliance"),
            DeploymentModel::Docker => write!(f, "Docker"),
        }
    }
}

impl FromStr for DeploymentModel {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "appliance" => Ok(DeploymentModel::Appliance),
            "docker" => Ok(DeploymentModel::Docker),
            _ => Err(CapabilityError::UnknownModel(s.to_string())),
        }
    }
}

/// Dotted numeric firmware version such as `10.0.6.0`.
///
/// Missing trailing components compare as zero, so `10.0` equals `10.0.0.0`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FirmwareVersion {
    parts: Vec<u32>,
}

impl FirmwareVersion {
    #[must_use]
    pub fn new(parts: Vec<u32>) -> Self {
        Self { parts }
    }

    /// The numeric components.
    #[must_use]
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    fn component(&self, index: usize) -> u32 {
        self.parts.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for FirmwareVersion {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CapabilityError::InvalidVersion(s.to_string()));
        }
        let parts = trimmed
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CapabilityError::InvalidVersion(s.to_string()))?;
        Ok(Self { parts })
    }
}

impl TryFrom<String> for FirmwareVersion {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FirmwareVersion> for String {
    fn from(version: FirmwareVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.parts.iter().map(u32::to_string).collect();
        write!(f, "{}", joined.join("."))
    }
}

impl PartialEq for FirmwareVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A capability precondition that the appliance does not meet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("API invoked requires modules: {missing:?}, which are not activated")]
    MissingModules { missing: Vec<String> },

    #[error("API invoked requires firmware {required} or later, appliance runs {actual}")]
    VersionTooLow {
        required: FirmwareVersion,
        actual: FirmwareVersion,
    },

    #[error("invalid firmware version: {0:?}")]
    InvalidVersion(String),

    #[error("unknown deployment model: {0:?}")]
    UnknownModel(String),
}

/// What the connected appliance actually is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceFacts {
    pub model: DeploymentModel,
    pub firmware: FirmwareVersion,
    #[serde(default)]
    pub modules: Vec<String>,
}

impl ApplianceFacts {
    #[must_use]
    pub fn new(model: DeploymentModel, firmware: FirmwareVersion) -> Self {
        Self {
            model,
            firmware,
            modules: Vec::new(),
        }
    }

    /// Mark a feature module as activated.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }

    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }
}

/// Preconditions an operation places on the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requirements {
    /// Required deployment model, if any.
    pub model: Option<DeploymentModel>,
    /// Feature modules that must all be activated.
    pub modules: Vec<String>,
    /// Minimum firmware version, if any.
    pub min_version: Option<FirmwareVersion>,
}

impl Requirements {
    /// No preconditions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Require a deployment model.
    #[must_use]
    pub fn model(model: DeploymentModel) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    /// Require an activated feature module.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }

    /// Require a minimum firmware version.
    #[must_use]
    pub fn with_min_version(mut self, version: FirmwareVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Check these requirements against an appliance.
    ///
    /// A deployment model mismatch means the API does not exist there, which
    /// is reported as [`EnvironmentSupport::Unsupported`] rather than an
    /// error. Missing modules or old firmware are errors.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::MissingModules`] or
    /// [`CapabilityError::VersionTooLow`].
    pub fn check(&self, facts: &ApplianceFacts) -> Result<EnvironmentSupport, CapabilityError> {
        if let Some(model) = self.model {
            if model != facts.model {
                return Ok(EnvironmentSupport::Unsupported(format!(
                    "API invoked requires model: {model}, appliance is of deployment model: {}.",
                    facts.model
                )));
            }
        }

        let missing: Vec<String> = self
            .modules
            .iter()
            .filter(|m| !facts.has_module(m))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CapabilityError::MissingModules { missing });
        }

        if let Some(required) = &self.min_version {
            if facts.firmware < *required {
                return Err(CapabilityError::VersionTooLow {
                    required: required.clone(),
                    actual: facts.firmware.clone(),
                });
            }
        }

        Ok(EnvironmentSupport::Supported)
    }
}

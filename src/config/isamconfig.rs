// SPDX-License-Identifier: MIT OR Apache-2.0

//! Appliance profile file parser
//!
//! The profile file (typically `~/.isam/config`) describes one or more
//! appliances by what they are (deployment model, firmware, activated
//! modules) and the default flags for mutating operations against them.
//!
//! # Example
//!
//! ```no_run
//! use isam_api_rs::config::IsamConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IsamConfig::load_default()?;
//!
//! if let Some(profile) = config.active_context() {
//!     println!("Firmware: {}", profile.firmware);
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::{ApplianceFacts, DeploymentModel, FirmwareVersion};
use crate::error::{IsamError, Result};
use crate::idempotent::OperationOptions;

/// Environment variable holding the profile file path.
pub const ENV_ISAMCONFIG: &str = "ISAMCONFIG";

/// Environment variable overriding the active context.
pub const ENV_ISAM_CONTEXT: &str = "ISAM_CONTEXT";

/// The whole profile file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsamConfig {
    /// The currently active context name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Map of context names to appliance profiles
    pub contexts: HashMap<String, ApplianceProfile>,
}

/// One appliance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplianceProfile {
    /// Deployment model
    #[serde(default)]
    pub model: DeploymentModel,

    /// Firmware version, e.g. `10.0.6.0`
    pub firmware: FirmwareVersion,

    /// Activated feature modules
    #[serde(default)]
    pub modules: Vec<String>,

    /// Default check mode for mutating operations
    #[serde(default)]
    pub check_mode: bool,

    /// Default force flag for mutating operations
    #[serde(default)]
    pub force: bool,
}

impl IsamConfig {
    /// Load configuration from the path given by [`IsamConfig::config_path`]
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The home directory cannot be determined
    /// - The config file cannot be read
    /// - The config file is malformed
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration and apply the `ISAM_CONTEXT` override
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the overriding
    /// context does not exist.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load_default()?;
        if let Ok(context) = std::env::var(ENV_ISAM_CONTEXT) {
            config.use_context(context)?;
        }
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed YAML.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            IsamError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| IsamError::Config(format!("Failed to parse config YAML: {}", e)))
    }

    /// Get the default config file path (~/.isam/config)
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| IsamError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".isam").join("config"))
    }

    /// Get the path to the config file, respecting the ISAMCONFIG environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined when ISAMCONFIG is not set
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(ENV_ISAMCONFIG) {
            Ok(PathBuf::from(env_path))
        } else {
            Self::default_path()
        }
    }

    /// Switch the active context
    ///
    /// # Errors
    ///
    /// Returns an error if no context has that name.
    pub fn use_context(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !self.contexts.contains_key(&name) {
            return Err(IsamError::Config(format!("Unknown context: {name}")));
        }
        self.context = Some(name);
        Ok(())
    }

    /// Get the currently active context
    ///
    /// Returns `None` if no active context is set or if the context doesn't exist
    pub fn active_context(&self) -> Option<&ApplianceProfile> {
        self.context
            .as_ref()
            .and_then(|name| self.contexts.get(name))
    }

    /// Get a context by name
    pub fn get_context(&self, name: &str) -> Option<&ApplianceProfile> {
        self.contexts.get(name)
    }

    /// List all available context names
    pub fn context_names(&self) -> Vec<&String> {
        self.contexts.keys().collect()
    }
}

impl ApplianceProfile {
    /// What this appliance is, for capability checks
    #[must_use]
    pub fn facts(&self) -> ApplianceFacts {
        ApplianceFacts {
            model: self.model,
            firmware: self.firmware.clone(),
            modules: self.modules.clone(),
        }
    }

    /// Default flags for mutating operations
    #[must_use]
    pub fn options(&self) -> OperationOptions {
        OperationOptions::new()
            .check_mode(self.check_mode)
            .force(self.force)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! RSA SecurID configuration for the reverse proxy.
//!
//! The appliance holds at most one RSA server configuration file
//! (`sdconf.rec`) and a node secret negotiated with the RSA server. The
//! configuration is either `available` or not; upload and delete converge
//! on those two states.
//!
//! # Example
//!
//! ```
//! use isam_api_rs::idempotent::OperationOptions;
//! use isam_api_rs::resources::RsaConfig;
//! use isam_api_rs::runtime::OperationLogger;
//! use isam_api_rs::testkit::FakeAppliance;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> isam_api_rs::error::Result<()> {
//! let appliance = FakeAppliance::appliance().with_rsa_config(b"sdconf".to_vec());
//! let logger = OperationLogger::new();
//! let rsa = RsaConfig::new(&appliance, &logger);
//!
//! let planned = rsa.delete(OperationOptions::new().check_mode(true)).await?;
//! assert!(planned.changed);
//! assert!(rsa.is_configured().await?);
//! # Ok(())
//! # }
//! ```

use serde_json::{json, Map};
use std::fmt;
use std::path::Path;

use crate::client::{ApplianceClient, DeploymentModel, FileSpec, Requirements};
use crate::envelope::Envelope;
use crate::error::Result;
use crate::idempotent::{self, Intent, OperationOptions};
use crate::runtime::OperationLogger;

/// Base URI of the RSA configuration API.
pub const RSA_CONFIG_URI: &str = "/wga/rsa_config";

/// Form field the configuration file is uploaded under.
pub const SERVER_CONFIG_FIELD: &str = "server_config_file";

/// Reported with every upload, planned or real.
pub const UPLOAD_NOTICE: &str = "Idempotency check is only to see if there was a config already uploaded. Force upload to replace existing configuration.";

const AVAILABLE: &str = "available";

fn requirements() -> Requirements {
    Requirements::model(DeploymentModel::Appliance).with_module("wga")
}

fn server_config_available(envelope: &Envelope) -> bool {
    envelope.str_field("server_config") == Some(AVAILABLE)
}

/// Username and passcode for an RSA authentication test.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaCredentials {
    pub username: String,
    pub passcode: String,
}

impl RsaCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, passcode: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            passcode: passcode.into(),
        }
    }
}

impl fmt::Debug for RsaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaCredentials")
            .field("username", &self.username)
            .field("passcode", &"[REDACTED]")
            .finish()
    }
}

/// Operations on the RSA SecurID configuration.
#[derive(Debug)]
pub struct RsaConfig<'a, C> {
    client: &'a C,
    logger: &'a OperationLogger,
}

impl<'a, C: ApplianceClient> RsaConfig<'a, C> {
    #[must_use]
    pub fn new(client: &'a C, logger: &'a OperationLogger) -> Self {
        Self { client, logger }
    }

    async fn fetch(&self) -> Result<Envelope> {
        self.client
            .invoke_get(
                "Retrieve RSA Securid Configuration",
                RSA_CONFIG_URI,
                &requirements(),
            )
            .await
    }

    /// Retrieve the RSA SecurID configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability check or the call fails.
    pub async fn get(&self) -> Result<Envelope> {
        idempotent::observe(
            self.logger,
            "Retrieve RSA Securid Configuration",
            self.fetch(),
        )
        .await
    }

    /// Whether a server configuration has been uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability check or the call fails.
    pub async fn is_configured(&self) -> Result<bool> {
        let current = self.fetch().await?;
        Ok(!current.is_unsupported() && server_config_available(&current))
    }

    /// Upload a server configuration file unless one is already present.
    ///
    /// Only the presence of a configuration is compared, not its contents;
    /// use `force` to replace an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability check or a call fails, or the file
    /// cannot be read.
    pub async fn upload(
        &self,
        filename: impl AsRef<Path>,
        options: OperationOptions,
    ) -> Result<Envelope> {
        let description = "Upload a RSA Securid Config file";
        let files = [FileSpec::octet_stream(
            SERVER_CONFIG_FIELD,
            filename.as_ref(),
        )];
        let path = format!("{RSA_CONFIG_URI}/server_config");
        let fields = Map::new();
        let requires = requirements();
        idempotent::mutate_if_needed(
            self.logger,
            Intent::new(description, options).with_notice(UPLOAD_NOTICE),
            self.fetch(),
            server_config_available,
            |warnings| {
                self.client
                    .invoke_post_files(description, &path, &files, &fields, &requires, warnings)
            },
        )
        .await
    }

    /// Test the configuration by authenticating a user.
    ///
    /// Skipped with a warning when no configuration is present. The result
    /// never counts as a change; authentication failures are reported as
    /// warnings rather than errors.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability check fails or the configuration
    /// cannot be read.
    pub async fn test(&self, credentials: &RsaCredentials) -> Result<Envelope> {
        let description = "Test RSA Configuration with username/passcode";
        let path = format!("{RSA_CONFIG_URI}/test");
        let body = json!({
            "username": credentials.username,
            "passcode": credentials.passcode,
        });
        let requires = requirements();
        idempotent::test_configuration(
            self.logger,
            description,
            self.fetch(),
            server_config_available,
            || {
                self.client
                    .invoke_post(description, &path, &body, &requires, true)
            },
        )
        .await
    }

    /// Delete the server configuration if one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability check or a call fails.
    pub async fn delete(&self, options: OperationOptions) -> Result<Envelope> {
        self.delete_part(
            "Deleting or Clear RSA Securid Configuration",
            "server_config",
            options,
        )
        .await
    }

    /// Clear the node secret if a server configuration is present.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability check or a call fails.
    pub async fn clear_node_secret(&self, options: OperationOptions) -> Result<Envelope> {
        self.delete_part("Clear the node secret file", "node_secret", options)
            .await
    }

    async fn delete_part(
        &self,
        description: &str,
        part: &str,
        options: OperationOptions,
    ) -> Result<Envelope> {
        let path = format!("{RSA_CONFIG_URI}/{part}");
        let requires = requirements();
        idempotent::mutate_if_needed(
            self.logger,
            Intent::new(description, options),
            self.fetch(),
            |current| !server_config_available(current),
            |_| self.client.invoke_delete(description, &path, &requires),
        )
        .await
    }
}

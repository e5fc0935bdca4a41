// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent wrappers for appliance resources.
//!
//! Each wrapper borrows an [`ApplianceClient`](crate::client::ApplianceClient)
//! and an [`OperationLogger`](crate::runtime::OperationLogger) and follows
//! the protocol in [`idempotent`](crate::idempotent).

mod cluster_log;
mod rsa_config;

pub use cluster_log::{ClusterLogs, SnippetOptions, DEFAULT_SNIPPET_SIZE, LOGGING_URI};
pub use rsa_config::{
    RsaConfig, RsaCredentials, RSA_CONFIG_URI, SERVER_CONFIG_FIELD, UPLOAD_NOTICE,
};

// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod idempotent;
pub mod resources;
pub mod runtime;
pub mod testkit;

pub use client::{ApplianceClient, Requirements};
pub use envelope::{EnvironmentSupport, Envelope};
pub use error::IsamError;
pub use idempotent::OperationOptions;
pub use resources::{ClusterLogs, RsaConfig, RsaCredentials};

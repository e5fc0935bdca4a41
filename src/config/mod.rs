// SPDX-License-Identifier: MIT OR Apache-2.0

//! Appliance profiles
//!
//! A YAML profile file records what each managed appliance is, so capability
//! requirements can be checked before any call, along with the default
//! `check_mode`/`force` flags for mutating operations.
//!
//! # Environment Variables
//!
//! - `ISAMCONFIG` - Path to the profile file (default: `~/.isam/config`)
//! - `ISAM_CONTEXT` - Override the active context
//!
//! # Example
//!
//! ```no_run
//! use isam_api_rs::config::IsamConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IsamConfig::load_with_env()?;
//!
//! if let Some(profile) = config.active_context() {
//!     println!("Default options: {:?}", profile.options());
//! }
//! # Ok(())
//! # }
//! ```

mod isamconfig;

pub use isamconfig::{ApplianceProfile, IsamConfig, ENV_ISAMCONFIG, ENV_ISAM_CONTEXT};

// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory appliance for tests and dry runs.
//!
//! [`FakeAppliance`] implements [`ApplianceClient`] over a small model of the
//! appliance's state: cluster manager log files, the RSA SecurID server
//! configuration, and the RSA node secret. It checks capability
//! requirements the way a real client does and records every call it
//! dispatches, so tests can assert that no mutating request was sent.

use http::Method;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::client::{
    encode_path_segment, suppress_error, ApplianceClient, ApplianceFacts, DeploymentModel, FileSpec, FirmwareVersion,
    Requirements,
};
use crate::envelope::{EnvironmentSupport, Envelope};
use crate::error::{IsamError, Result};

const LOGGING_PREFIX: &str = "/isam/cluster/logging/";
const RSA_CONFIG: &str = "/wga/rsa_config";

/// A call that passed the capability check and reached the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub description: String,
}

impl RecordedCall {
    /// Whether the call could have changed appliance state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD)
    }
}

/// Snapshot of the fake appliance's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplianceState {
    /// Cluster manager log files by id.
    pub log_files: BTreeMap<String, String>,
    /// Uploaded RSA server configuration, if any.
    pub rsa_server_config: Option<Vec<u8>>,
    /// Whether an RSA node secret is present.
    pub rsa_node_secret: bool,
    /// Username and passcode accepted by the RSA test endpoint.
    pub rsa_valid_user: Option<(String, String)>,
}

/// In-memory [`ApplianceClient`].
#[derive(Debug)]
pub struct FakeAppliance {
    facts: ApplianceFacts,
    state: Mutex<ApplianceState>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn firmware() -> FirmwareVersion {
    FirmwareVersion::new(vec![10, 0, 6, 0])
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(path: &str) -> IsamError {
    IsamError::Api {
        status: http::StatusCode::NOT_FOUND,
        message: format!("no such resource: {path}"),
    }
}

/// Split `path?query` into its path and whether a query is present.
fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

/// The stored log id whose encoded form is `segment`.
fn log_key(state: &ApplianceState, segment: &str) -> Option<String> {
    state
        .log_files
        .keys()
        .find(|id| encode_path_segment(id).is_ok_and(|encoded| encoded == segment))
        .cloned()
}

/// Extract the encoded `{id}` from `/isam/cluster/logging/{id}/v1`.
fn log_file_id(path: &str) -> Option<&str> {
    path.strip_prefix(LOGGING_PREFIX)
        .and_then(|rest| rest.strip_suffix("/v1"))
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

impl FakeAppliance {
    /// A fake with the given facts and empty state.
    #[must_use]
    pub fn new(facts: ApplianceFacts) -> Self {
        Self {
            facts,
            state: Mutex::new(ApplianceState::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A hardware appliance with the `wga` module activated.
    #[must_use]
    pub fn appliance() -> Self {
        Self::new(ApplianceFacts::new(DeploymentModel::Appliance, firmware()).with_module("wga"))
    }

    /// A hardware appliance with no feature modules activated.
    #[must_use]
    pub fn appliance_without_modules() -> Self {
        Self::new(ApplianceFacts::new(DeploymentModel::Appliance, firmware()))
    }

    /// A container deployment with the `wga` module activated.
    #[must_use]
    pub fn docker() -> Self {
        Self::new(ApplianceFacts::new(DeploymentModel::Docker, firmware()).with_module("wga"))
    }

    /// Add a cluster manager log file.
    #[must_use]
    pub fn with_log_file(self, id: impl Into<String>, contents: impl Into<String>) -> Self {
        lock(&self.state)
            .log_files
            .insert(id.into(), contents.into());
        self
    }

    /// Pretend an RSA server configuration was already uploaded.
    #[must_use]
    pub fn with_rsa_config(self, contents: impl Into<Vec<u8>>) -> Self {
        lock(&self.state).rsa_server_config = Some(contents.into());
        self
    }

    /// Pretend the appliance holds an RSA node secret.
    #[must_use]
    pub fn with_node_secret(self) -> Self {
        lock(&self.state).rsa_node_secret = true;
        self
    }

    /// Accept this username and passcode on the RSA test endpoint.
    #[must_use]
    pub fn with_rsa_user(self, username: impl Into<String>, passcode: impl Into<String>) -> Self {
        lock(&self.state).rsa_valid_user = Some((username.into(), passcode.into()));
        self
    }

    #[must_use]
    pub fn facts(&self) -> &ApplianceFacts {
        &self.facts
    }

    /// A copy of the current state.
    #[must_use]
    pub fn state(&self) -> ApplianceState {
        lock(&self.state).clone()
    }

    /// Every dispatched call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Dispatched calls that could have changed state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(RecordedCall::is_mutating)
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Check requirements without recording anything.
    ///
    /// Returns the envelope to hand back when the call must not be
    /// dispatched.
    fn gate(&self, requires: &Requirements) -> Result<Option<Envelope>> {
        match requires.check(&self.facts)? {
            EnvironmentSupport::Unsupported(reason) => Ok(Some(Envelope::unsupported(reason))),
            EnvironmentSupport::Supported => Ok(None),
        }
    }

    fn record(&self, method: Method, description: &str, path: &str) {
        lock(&self.calls).push(RecordedCall {
            method,
            path: path.to_string(),
            description: description.to_string(),
        });
    }

    /// Check requirements and record the call if it may proceed.
    fn admit(
        &self,
        method: Method,
        description: &str,
        path: &str,
        requires: &Requirements,
    ) -> Result<Option<Envelope>> {
        let skipped = self.gate(requires)?;
        if skipped.is_none() {
            self.record(method, description, path);
        }
        Ok(skipped)
    }

    fn rsa_status(state: &ApplianceState) -> Value {
        let availability = |present: bool| if present { "available" } else { "unavailable" };
        json!({
            "server_config": availability(state.rsa_server_config.is_some()),
            "node_secret": availability(state.rsa_node_secret),
        })
    }

    fn get(&self, path: &str) -> Result<Envelope> {
        let state = lock(&self.state);
        let (path, _) = split_path(path);

        if path == "/isam/cluster/logging/v1" {
            let files: Vec<Value> = state
                .log_files
                .keys()
                .map(|id| json!({ "id": id }))
                .collect();
            return Ok(Envelope::new().with_data(Value::Array(files)));
        }
        if let Some(id) = log_file_id(path) {
            let contents = log_key(&state, id)
                .and_then(|key| state.log_files.get(&key))
                .ok_or_else(|| not_found(path))?;
            return Ok(Envelope::new().with_data(json!({ "contents": contents })));
        }
        if path == RSA_CONFIG {
            return Ok(Envelope::new().with_data(Self::rsa_status(&state)));
        }
        Err(not_found(path))
    }

    fn delete(&self, path: &str) -> Result<Envelope> {
        let mut state = lock(&self.state);

        if let Some(id) = log_file_id(path) {
            let key = log_key(&state, id).ok_or_else(|| not_found(path))?;
            if let Some(contents) = state.log_files.get_mut(&key) {
                contents.clear();
            }
            return Ok(Envelope::new().with_changed(true));
        }
        match path.strip_prefix(RSA_CONFIG) {
            Some("/server_config") => {
                state.rsa_server_config = None;
                Ok(Envelope::new().with_changed(true))
            }
            Some("/node_secret") => {
                state.rsa_node_secret = false;
                Ok(Envelope::new().with_changed(true))
            }
            _ => Err(not_found(path)),
        }
    }

    fn post(&self, path: &str, body: &Value) -> Result<Envelope> {
        if path != format!("{RSA_CONFIG}/test") {
            return Err(not_found(path));
        }
        let state = lock(&self.state);
        let username = body.get("username").and_then(Value::as_str);
        let passcode = body.get("passcode").and_then(Value::as_str);

        let accepted = matches!(
            (&state.rsa_valid_user, username, passcode),
            (Some((u, p)), Some(username), Some(passcode)) if u == username && p == passcode
        );
        if accepted {
            Ok(Envelope::new().with_data(json!({ "message": "Authentication successful" })))
        } else {
            Err(IsamError::Api {
                status: http::StatusCode::BAD_REQUEST,
                message: "RSA authentication failed".to_string(),
            })
        }
    }
}

impl ApplianceClient for FakeAppliance {
    async fn invoke_get(
        &self,
        description: &str,
        path: &str,
        requires: &Requirements,
    ) -> Result<Envelope> {
        if let Some(skipped) = self.admit(Method::GET, description, path, requires)? {
            return Ok(skipped);
        }
        self.get(path)
    }

    async fn invoke_post(
        &self,
        description: &str,
        path: &str,
        body: &Value,
        requires: &Requirements,
        ignore_error: bool,
    ) -> Result<Envelope> {
        if let Some(skipped) = self.admit(Method::POST, description, path, requires)? {
            return Ok(skipped);
        }
        // Every dispatched POST is flagged as a change, failed or not.
        suppress_error(self.post(path, body), ignore_error).map(|env| env.with_changed(true))
    }

    async fn invoke_delete(
        &self,
        description: &str,
        path: &str,
        requires: &Requirements,
    ) -> Result<Envelope> {
        if let Some(skipped) = self.admit(Method::DELETE, description, path, requires)? {
            return Ok(skipped);
        }
        self.delete(path)
    }

    async fn invoke_post_files(
        &self,
        description: &str,
        path: &str,
        files: &[FileSpec],
        _fields: &Map<String, Value>,
        requires: &Requirements,
        warnings: Vec<String>,
    ) -> Result<Envelope> {
        if let Some(skipped) = self.gate(requires)? {
            return Ok(skipped);
        }
        // The upload body is read before anything is sent.
        let spec = files
            .iter()
            .find(|f| f.field_name == "server_config_file")
            .ok_or_else(|| {
                IsamError::Validation("missing form field server_config_file".to_string())
            })?;
        let contents = tokio::fs::read(&spec.filename).await?;

        self.record(Method::POST, description, path);
        if path != format!("{RSA_CONFIG}/server_config") {
            return Err(not_found(path));
        }
        lock(&self.state).rsa_server_config = Some(contents);
        Ok(Envelope {
            changed: true,
            warnings,
            ..Envelope::default()
        })
    }

    async fn invoke_get_file(
        &self,
        description: &str,
        path: &str,
        destination: &Path,
        requires: &Requirements,
    ) -> Result<Envelope> {
        if let Some(skipped) = self.admit(Method::GET, description, path, requires)? {
            return Ok(skipped);
        }
        let (bare, query) = split_path(path);
        let contents = match (log_file_id(bare), query) {
            (Some(id), Some("export")) => {
                let state = lock(&self.state);
                log_key(&state, id)
                    .and_then(|key| state.log_files.get(&key).cloned())
                    .ok_or_else(|| not_found(bare))?
            }
            _ => return Err(not_found(path)),
        };
        tokio::fs::write(destination, contents).await?;
        Ok(Envelope::new().with_changed(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_id() {
        assert_eq!(log_file_id("/isam/cluster/logging/lmi/v1"), Some("lmi"));
        assert_eq!(log_file_id("/isam/cluster/logging/v1"), None);
        assert_eq!(log_file_id("/isam/cluster/logging/a/b/v1"), None);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/a/v1?export"), ("/a/v1", Some("export")));
        assert_eq!(split_path("/a/v1"), ("/a/v1", None));
    }

    #[test]
    fn test_recorded_call_is_mutating() {
        let call = |method| RecordedCall {
            method,
            path: "/".into(),
            description: String::new(),
        };
        assert!(!call(Method::GET).is_mutating());
        assert!(call(Method::POST).is_mutating());
        assert!(call(Method::DELETE).is_mutating());
    }

    #[tokio::test]
    async fn test_get_unknown_log_file() {
        let fake = FakeAppliance::appliance();
        let err = fake
            .invoke_get("get", "/isam/cluster/logging/nope/v1", &Requirements::none())
            .await
            .unwrap_err();
        assert!(matches!(err, IsamError::Api { status, .. } if status == http::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_rsa_status_shape() {
        let fake = FakeAppliance::appliance().with_node_secret();
        let env = fake
            .invoke_get("get", RSA_CONFIG, &Requirements::none())
            .await
            .unwrap();
        assert_eq!(env.str_field("server_config"), Some("unavailable"));
        assert_eq!(env.str_field("node_secret"), Some("available"));
    }

    #[tokio::test]
    async fn test_failed_post_without_ignore_error() {
        let fake = FakeAppliance::appliance().with_rsa_user("alice", "123456");
        let body = json!({"username": "alice", "passcode": "000000"});
        let err = fake
            .invoke_post("test", "/wga/rsa_config/test", &body, &Requirements::none(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, IsamError::Api { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_upload_is_not_recorded() {
        let fake = FakeAppliance::appliance();
        let dir = tempfile::tempdir().unwrap();
        let files = [FileSpec::octet_stream(
            "server_config_file",
            dir.path().join("absent.rec"),
        )];
        let err = fake
            .invoke_post_files(
                "upload",
                "/wga/rsa_config/server_config",
                &files,
                &Map::new(),
                &Requirements::none(),
                Vec::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IsamError::Io(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_log_ids_match_their_encoded_segment() {
        let fake = FakeAppliance::appliance().with_log_file("a b", "x");
        let env = fake
            .invoke_get("get", "/isam/cluster/logging/a%20b/v1", &Requirements::none())
            .await
            .unwrap();
        assert_eq!(env.str_field("contents"), Some("x"));
        assert!(fake
            .invoke_get("get", "/isam/cluster/logging/a b/v1", &Requirements::none())
            .await
            .is_err());
    }
}

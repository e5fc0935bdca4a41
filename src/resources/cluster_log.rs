// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cluster manager log files.
//!
//! Log files can be listed, read as snippets, cleared, and exported to a
//! local file. Clearing is idempotent: a log whose contents are already
//! empty is left alone unless forced.
//!
//! These endpoints only exist on hardware and virtual appliances; on a
//! container deployment every operation reports the environment as
//! unsupported and does nothing.

use std::path::Path;

use crate::client::{encode_path_segment, ApplianceClient, DeploymentModel, Requirements};
use crate::envelope::Envelope;
use crate::error::{IsamError, Result};
use crate::idempotent::{self, Intent, OperationOptions};
use crate::runtime::OperationLogger;

/// Base URI of the cluster manager logging API.
pub const LOGGING_URI: &str = "/isam/cluster/logging";

/// Default number of lines returned by a snippet.
pub const DEFAULT_SNIPPET_SIZE: u32 = 100;

fn requirements() -> Requirements {
    Requirements::model(DeploymentModel::Appliance)
}

/// Path of one log file; the id is percent-encoded as a single segment.
fn file_uri(file_id: &str) -> Result<String> {
    if file_id.contains('/') {
        return Err(IsamError::Validation(format!(
            "invalid log file id: {file_id:?}"
        )));
    }
    let segment = encode_path_segment(file_id)?;
    Ok(format!("{LOGGING_URI}/{segment}/v1"))
}

/// Which part of a log file to retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetOptions {
    /// Number of lines to return.
    pub size: u32,
    /// Line to start from; the appliance returns the tail when unset.
    pub start: Option<u64>,
    /// Extra formatting options understood by the appliance, e.g. `line-numbers`.
    pub options: Option<String>,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_SNIPPET_SIZE,
            start: None,
            options: None,
        }
    }
}

impl SnippetOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Encode as a URL query string.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("size", &self.size.to_string());
        if let Some(start) = self.start {
            query.append_pair("start", &start.to_string());
        }
        if let Some(options) = &self.options {
            query.append_pair("options", options);
        }
        query.finish()
    }
}

/// Whether a log snippet envelope shows an empty log.
///
/// A payload without a string `contents` is not known to be empty.
fn is_empty_log(envelope: &Envelope) -> bool {
    envelope.str_field("contents") == Some("")
}

/// Operations on cluster manager log files.
#[derive(Debug)]
pub struct ClusterLogs<'a, C> {
    client: &'a C,
    logger: &'a OperationLogger,
}

impl<'a, C: ApplianceClient> ClusterLogs<'a, C> {
    #[must_use]
    pub fn new(client: &'a C, logger: &'a OperationLogger) -> Self {
        Self { client, logger }
    }

    async fn fetch(&self, file_id: &str, snippet: &SnippetOptions) -> Result<Envelope> {
        let path = format!("{}?{}", file_uri(file_id)?, snippet.to_query());
        self.client
            .invoke_get("Retrieve a log file snippet", &path, &requirements())
            .await
    }

    /// Retrieve the cluster manager log file names.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn get_all(&self) -> Result<Envelope> {
        let description = "Retrieve the cluster manager log file names";
        idempotent::observe(
            self.logger,
            description,
            self.client
                .invoke_get(description, &format!("{LOGGING_URI}/v1"), &requirements()),
        )
        .await
    }

    /// Retrieve a log file snippet.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or the call fails.
    pub async fn get(&self, file_id: &str, snippet: &SnippetOptions) -> Result<Envelope> {
        idempotent::observe(
            self.logger,
            "Retrieve a log file snippet",
            self.fetch(file_id, snippet),
        )
        .await
    }

    /// Whether the log file currently has any contents.
    ///
    /// An unsupported deployment reports `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or the call fails.
    pub async fn has_contents(&self, file_id: &str) -> Result<bool> {
        let current = self.fetch(file_id, &SnippetOptions::default()).await?;
        Ok(!current.is_unsupported() && !is_empty_log(&current))
    }

    /// Clear a log file if it has contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or a call fails.
    pub async fn clear(&self, file_id: &str, options: OperationOptions) -> Result<Envelope> {
        let description = "Clear a log file";
        let requires = requirements();
        idempotent::mutate_if_needed(
            self.logger,
            Intent::new(description, options),
            self.fetch(file_id, &SnippetOptions::default()),
            is_empty_log,
            |_| async move {
                let path = file_uri(file_id)?;
                self.client.invoke_delete(description, &path, &requires).await
            },
        )
        .await
    }

    /// Export a log file to `destination`.
    ///
    /// Skipped when the destination already exists (unless forced) and in
    /// check mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid, the destination cannot be
    /// inspected or written, or the call fails.
    pub async fn export_file(
        &self,
        file_id: &str,
        destination: impl AsRef<Path>,
        options: OperationOptions,
    ) -> Result<Envelope> {
        let description = "Export a cluster manager log file";
        let destination = destination.as_ref();
        let path = format!("{}?export", file_uri(file_id)?);
        let requires = requirements();
        idempotent::export_if_needed(self.logger, description, destination, options, || {
            self.client
                .invoke_get_file(description, &path, destination, &requires)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::FakeAppliance;
    use http::Method;

    #[test]
    fn test_snippet_defaults() {
        let snippet = SnippetOptions::new();
        assert_eq!(snippet.size, 100);
        assert_eq!(snippet.to_query(), "size=100");
    }

    #[test]
    fn test_snippet_query() {
        let snippet = SnippetOptions::new()
            .size(20)
            .start(5)
            .options("line-numbers");
        assert_eq!(snippet.to_query(), "size=20&start=5&options=line-numbers");
    }

    #[test]
    fn test_snippet_query_is_encoded() {
        let snippet = SnippetOptions::new().options("a b&c");
        assert_eq!(snippet.to_query(), "size=100&options=a+b%26c");
    }

    #[test]
    fn test_file_uri() {
        assert_eq!(
            file_uri("cluster.log").unwrap(),
            "/isam/cluster/logging/cluster.log/v1"
        );
        assert_eq!(
            file_uri("a?export").unwrap(),
            "/isam/cluster/logging/a%3Fexport/v1"
        );
        assert!(file_uri("").is_err());
        assert!(file_uri(".").is_err());
        assert!(file_uri("..").is_err());
        assert!(file_uri("../etc").is_err());
    }

    #[tokio::test]
    async fn test_get_sends_snippet_query() {
        let fake = FakeAppliance::appliance().with_log_file("cluster.log", "line\n");
        let logger = OperationLogger::silent();
        let logs = ClusterLogs::new(&fake, &logger);

        let env = logs
            .get("cluster.log", &SnippetOptions::new().size(10))
            .await
            .unwrap();

        assert_eq!(env.str_field("contents"), Some("line\n"));
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::GET);
        assert_eq!(calls[0].path, "/isam/cluster/logging/cluster.log/v1?size=10");
    }

    #[tokio::test]
    async fn test_get_all_lists_files() {
        let fake = FakeAppliance::appliance()
            .with_log_file("a.log", "")
            .with_log_file("b.log", "x");
        let logger = OperationLogger::silent();

        let env = ClusterLogs::new(&fake, &logger).get_all().await.unwrap();
        assert_eq!(env.data, serde_json::json!([{"id": "a.log"}, {"id": "b.log"}]));
        assert_eq!(logger.metrics().unchanged(), 1);
    }

    #[tokio::test]
    async fn test_has_contents() {
        let fake = FakeAppliance::appliance()
            .with_log_file("full.log", "x")
            .with_log_file("empty.log", "");
        let logger = OperationLogger::silent();
        let logs = ClusterLogs::new(&fake, &logger);

        assert!(logs.has_contents("full.log").await.unwrap());
        assert!(!logs.has_contents("empty.log").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_sends_delete() {
        let fake = FakeAppliance::appliance().with_log_file("cluster.log", "x");
        let logger = OperationLogger::silent();

        let env = ClusterLogs::new(&fake, &logger)
            .clear("cluster.log", OperationOptions::new())
            .await
            .unwrap();

        assert!(env.changed);
        let mutating = fake.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].method, Method::DELETE);
        assert_eq!(mutating[0].path, "/isam/cluster/logging/cluster.log/v1");
    }

    #[tokio::test]
    async fn test_clear_rejects_bad_id_without_calls() {
        let fake = FakeAppliance::appliance();
        let logger = OperationLogger::silent();

        let err = ClusterLogs::new(&fake, &logger)
            .clear("a/b", OperationOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, IsamError::Validation(_)));
        assert!(fake.calls().is_empty());
        assert_eq!(logger.metrics().failed(), 1);
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let fake = FakeAppliance::appliance().with_log_file("cluster.log", "exported");
        let logger = OperationLogger::silent();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cluster.log");

        let env = ClusterLogs::new(&fake, &logger)
            .export_file("cluster.log", &target, OperationOptions::new())
            .await
            .unwrap();

        assert!(env.changed);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "exported");
        assert_eq!(
            fake.calls()[0].path,
            "/isam/cluster/logging/cluster.log/v1?export"
        );
    }

    #[test]
    fn test_is_empty_log_needs_string_contents() {
        let empty = Envelope::new().with_data(serde_json::json!({"contents": ""}));
        let full = Envelope::new().with_data(serde_json::json!({"contents": "x"}));
        let missing = Envelope::new();
        let odd = Envelope::new().with_data(serde_json::json!({"contents": null}));
        assert!(is_empty_log(&empty));
        assert!(!is_empty_log(&full));
        assert!(!is_empty_log(&missing));
        assert!(!is_empty_log(&odd));
    }

    #[tokio::test]
    async fn test_clear_rejects_dot_segments() {
        let fake = FakeAppliance::appliance();
        let logger = OperationLogger::silent();
        let logs = ClusterLogs::new(&fake, &logger);

        for id in [".", ".."] {
            let err = logs.clear(id, OperationOptions::new().force(true)).await.unwrap_err();
            assert!(matches!(err, IsamError::Validation(_)));
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_clear_encodes_file_id() {
        let fake = FakeAppliance::appliance().with_log_file("a b%2F", "x");
        let logger = OperationLogger::silent();

        let env = ClusterLogs::new(&fake, &logger)
            .clear("a b%2F", OperationOptions::new())
            .await
            .unwrap();

        assert!(env.changed);
        let mutating = fake.mutating_calls();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].path, "/isam/cluster/logging/a%20b%252F/v1");
        assert_eq!(fake.state().log_files["a b%2F"], "");
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! The appliance client interface consumed by the resource wrappers.
//!
//! Transport, sessions, and authentication live behind [`ApplianceClient`].
//! An implementation is expected to check an operation's [`Requirements`]
//! against the connected appliance before dispatching anything, and to
//! normalise every response into an [`Envelope`].

mod capability;

pub use capability::{
    ApplianceFacts, CapabilityError, DeploymentModel, FirmwareVersion, Requirements,
};

use crate::envelope::Envelope;
use crate::error::{IsamError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// MIME type used for opaque file uploads.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Percent-encode a caller-supplied identifier as a single URI path segment.
///
/// `/`, `%`, spaces and other reserved characters are escaped, so the result
/// never introduces extra segments. `.`, `..` and control characters are
/// rejected.
///
/// # Errors
///
/// Returns [`IsamError::Validation`] for an empty, dot or control-character
/// segment.
pub fn encode_path_segment(segment: &str) -> Result<String> {
    if matches!(segment, "" | "." | "..") || segment.chars().any(char::is_control) {
        return Err(IsamError::Validation(format!(
            "invalid path segment: {segment:?}"
        )));
    }
    let mut url = url::Url::parse("http://appliance/")
        .map_err(|e| IsamError::Validation(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| IsamError::Validation("URL cannot carry a path".to_string()))?
        .clear()
        .push(segment);
    Ok(url.path().trim_start_matches('/').to_string())
}

/// One file part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Form field the appliance expects the file under.
    pub field_name: String,
    /// Local file to upload.
    pub filename: PathBuf,
    /// MIME type sent with the part.
    pub mime_type: String,
}

impl FileSpec {
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        filename: impl Into<PathBuf>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// A part with [`OCTET_STREAM`] as its MIME type.
    #[must_use]
    pub fn octet_stream(field_name: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self::new(field_name, filename, OCTET_STREAM)
    }
}

/// Access to an appliance's management API.
///
/// Every method takes a human-readable `description` of the call (used for
/// logging) and the [`Requirements`] of the endpoint. When the deployment
/// model does not match, implementations return
/// [`Envelope::unsupported`] without touching the network; missing modules
/// or old firmware are returned as [`IsamError::Capability`].
#[allow(async_fn_in_trait)]
pub trait ApplianceClient {
    /// GET a resource.
    async fn invoke_get(
        &self,
        description: &str,
        path: &str,
        requires: &Requirements,
    ) -> Result<Envelope>;

    /// POST a JSON body.
    ///
    /// With `ignore_error`, API and transport failures come back as an
    /// envelope carrying the failure as a warning instead of an error.
    async fn invoke_post(
        &self,
        description: &str,
        path: &str,
        body: &Value,
        requires: &Requirements,
        ignore_error: bool,
    ) -> Result<Envelope>;

    /// DELETE a resource.
    async fn invoke_delete(
        &self,
        description: &str,
        path: &str,
        requires: &Requirements,
    ) -> Result<Envelope>;

    /// POST a multipart form with file parts and extra fields.
    ///
    /// `warnings` are carried onto the returned envelope.
    async fn invoke_post_files(
        &self,
        description: &str,
        path: &str,
        files: &[FileSpec],
        fields: &Map<String, Value>,
        requires: &Requirements,
        warnings: Vec<String>,
    ) -> Result<Envelope>;

    /// GET a resource and write the body to `destination`.
    async fn invoke_get_file(
        &self,
        description: &str,
        path: &str,
        destination: &Path,
        requires: &Requirements,
    ) -> Result<Envelope>;

    /// Build an envelope without making a call.
    fn create_return_object(
        &self,
        changed: bool,
        warnings: Vec<String>,
        data: Option<Value>,
    ) -> Envelope {
        let envelope = Envelope {
            changed,
            warnings,
            ..Envelope::default()
        };
        match data {
            Some(data) => envelope.with_data(data),
            None => envelope,
        }
    }
}

/// Fold a failed call into a warning-carrying envelope when the caller asked
/// for errors to be ignored.
///
/// Only API and transport failures are folded; capability and local I/O
/// errors still propagate.
///
/// # Errors
///
/// Returns the original error when `ignore_error` is false or the error is
/// not suppressible.
pub fn suppress_error(result: Result<Envelope>, ignore_error: bool) -> Result<Envelope> {
    match result {
        Err(err) if ignore_error && err.is_suppressible() => {
            let data = match &err {
                IsamError::Api { status, message } => serde_json::json!({
                    "status": status.as_u16(),
                    "message": message,
                }),
                _ => Value::Object(Map::new()),
            };
            Ok(Envelope::unchanged(vec![err.to_string()]).with_data(data))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests;

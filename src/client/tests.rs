// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::testkit::FakeAppliance;
use serde_json::json;

#[test]
fn test_file_spec_octet_stream() {
    let spec = FileSpec::octet_stream("server_config_file", "/tmp/sdconf.rec");
    assert_eq!(spec.field_name, "server_config_file");
    assert_eq!(spec.filename, PathBuf::from("/tmp/sdconf.rec"));
    assert_eq!(spec.mime_type, "application/octet-stream");
}

#[test]
fn test_encode_path_segment() {
    assert_eq!(encode_path_segment("cluster.log").unwrap(), "cluster.log");
    assert_eq!(encode_path_segment("a b").unwrap(), "a%20b");
    assert_eq!(encode_path_segment("a/b").unwrap(), "a%2Fb");
    assert_eq!(encode_path_segment("a%2F").unwrap(), "a%252F");
    assert_eq!(encode_path_segment("a?b#c").unwrap(), "a%3Fb%23c");
}

#[test]
fn test_encode_path_segment_rejects_dots_and_controls() {
    for bad in ["", ".", "..", "a\tb", "a\nb"] {
        assert!(matches!(
            encode_path_segment(bad),
            Err(IsamError::Validation(_))
        ));
    }
}

#[test]
fn test_create_return_object() {
    let client = FakeAppliance::appliance();
    let env = client.create_return_object(true, vec!["w".into()], Some(json!({"a": 1})));
    assert!(env.changed);
    assert_eq!(env.warnings, vec!["w".to_string()]);
    assert_eq!(env.data, json!({"a": 1}));

    let empty = client.create_return_object(false, Vec::new(), None);
    assert_eq!(empty, Envelope::new());
}

#[test]
fn test_suppress_error_folds_api_failure() {
    let failed: Result<Envelope> = Err(IsamError::Api {
        status: http::StatusCode::BAD_REQUEST,
        message: "Authentication failed".into(),
    });
    let env = suppress_error(failed, true).unwrap();
    assert!(!env.changed);
    assert_eq!(env.field("status"), Some(&json!(400)));
    assert!(env.warnings[0].contains("Authentication failed"));
}

#[test]
fn test_suppress_error_respects_flag() {
    let failed: Result<Envelope> = Err(IsamError::Transport("timed out".into()));
    assert!(suppress_error(failed, false).is_err());
}

#[test]
fn test_suppress_error_never_hides_capability_failures() {
    let failed: Result<Envelope> = Err(IsamError::Capability(CapabilityError::MissingModules {
        missing: vec!["wga".into()],
    }));
    assert!(matches!(
        suppress_error(failed, true),
        Err(IsamError::Capability(_))
    ));
}

#[test]
fn test_suppress_error_passes_success_through() {
    let ok: Result<Envelope> = Ok(Envelope::new().with_changed(true));
    assert!(suppress_error(ok, true).unwrap().changed);
}

#[tokio::test]
async fn test_unsupported_model_makes_no_call() {
    let client = FakeAppliance::docker();
    let env = client
        .invoke_delete(
            "Clear a log file",
            "/isam/cluster/logging/lmi/v1",
            &Requirements::model(DeploymentModel::Appliance),
        )
        .await
        .unwrap();
    assert!(env.is_unsupported());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_missing_module_is_an_error() {
    let client = FakeAppliance::appliance_without_modules();
    let err = client
        .invoke_get(
            "Retrieve RSA Securid Configuration",
            "/wga/rsa_config",
            &Requirements::model(DeploymentModel::Appliance).with_module("wga"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IsamError::Capability(_)));
    assert!(client.calls().is_empty());
}

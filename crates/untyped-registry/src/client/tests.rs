//! Unit tests for registry client

use super::*;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_attempts: u32) -> RegistryClient {
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    };
    RegistryClient::with_config(config, RetryPolicy::immediate(max_attempts)).unwrap()
}

fn manifest_json(name: &str, version: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "version": version,
        "files": ["index.js"],
        "dist": {
            "tarball": format!("https://registry.npmjs.org/{name}/-/{name}-{version}.tgz"),
            "shasum": "abc123"
        }
    })
}

#[test]
fn test_registry_client_creation() {
    let client = RegistryClient::new().unwrap();
    assert_eq!(client.base_url(), "https://registry.npmjs.org");
    assert_eq!(client.retry_policy().max_attempts, 10);
}

#[test]
fn test_invalid_base_url_rejected() {
    let config = ClientConfig {
        base_url: "not a url".to_string(),
        ..ClientConfig::default()
    };
    assert!(matches!(
        RegistryClient::with_config(config, RetryPolicy::default()),
        Err(UntypedError::ConfigValidation { .. })
    ));
}

#[test]
fn test_manifest_url() {
    let config = ClientConfig {
        base_url: "http://localhost:4873/".to_string(),
        ..ClientConfig::default()
    };
    let client = RegistryClient::with_config(config, RetryPolicy::default()).unwrap();

    assert_eq!(client.manifest_url("left-pad", "1.0.0"), "http://localhost:4873/left-pad/1.0.0");
    assert_eq!(client.manifest_url("@scope/pkg", "latest"), "http://localhost:4873/@scope/pkg/latest");
}

#[tokio::test]
async fn test_fetch_manifest_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json("left-pad", "1.0.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let manifest = client.fetch_manifest("left-pad", "1.0.0").await.unwrap();

    assert_eq!(manifest.name, "left-pad");
    assert_eq!(manifest.version, "1.0.0");
    assert_eq!(manifest.declared_files().to_vec(), vec!["index.js".to_string()]);
}

#[tokio::test]
async fn test_fetch_scoped_manifest() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@scope/pkg/2.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json("@scope/pkg", "2.0.0")))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    let manifest = client.fetch_manifest("@scope/pkg", "2.0.0").await.unwrap();
    assert_eq!(manifest.name, "@scope/pkg");
}

#[tokio::test]
async fn test_fetch_manifest_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nonexistent-package/1.0.0"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 5);
    let result = client.fetch_manifest("nonexistent-package", "1.0.0").await;

    match result.unwrap_err() {
        UntypedError::PackageNotFound { name, version } => {
            assert_eq!(name, "nonexistent-package");
            assert_eq!(version, "1.0.0");
        },
        other => panic!("Expected PackageNotFound error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_retried_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json("left-pad", "1.0.0")))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let config = ClientConfig {
        base_url: mock_server.uri(),
        retry_not_found: true,
        ..ClientConfig::default()
    };
    let client = RegistryClient::with_config(config, RetryPolicy::immediate(5)).unwrap();

    let manifest = client.fetch_manifest("left-pad", "1.0.0").await.unwrap();
    assert_eq!(manifest.version, "1.0.0");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json("left-pad", "1.0.0")))
        .with_priority(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 5);
    let manifest = client.fetch_manifest("left-pad", "1.0.0").await.unwrap();
    assert_eq!(manifest.version, "1.0.0");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 3);
    match client.fetch_manifest("left-pad", "1.0.0").await.unwrap_err() {
        UntypedError::RetriesExhausted { attempts, last_error, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last_error, UntypedError::Network { .. }));
        },
        other => panic!("Expected RetriesExhausted error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_manifest_for_wrong_package_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/left-pad/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json("right-pad", "1.0.0")))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 2);
    match client.fetch_manifest("left-pad", "1.0.0").await.unwrap_err() {
        UntypedError::RetriesExhausted { last_error, .. } => {
            assert!(matches!(*last_error, UntypedError::MalformedResponse { .. }));
        },
        other => panic!("Expected RetriesExhausted error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_tarball_streams_to_file() {
    let mock_server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];

    Mock::given(method("GET"))
        .and(path("/left-pad/-/left-pad-1.0.0.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("download.tgz");
    let client = client_for(&mock_server, 1);
    let url = format!("{}/left-pad/-/left-pad-1.0.0.tgz", mock_server.uri());

    let written = client.fetch_tarball(&url, &dest).await.unwrap();
    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn test_fetch_tarball_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&mock_server, 1);
    let url = format!("{}/x.tgz", mock_server.uri());

    let err = client.fetch_tarball(&url, &dir.path().join("x.tgz")).await.unwrap_err();
    assert!(err.is_recoverable());
    assert!(!dir.path().join("x.tgz").exists());
}

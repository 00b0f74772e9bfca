//! Unit tests for CLI commands.

use super::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use untyped_config::ConfigSource;
use untyped_core::utils::hash::sha1_hex;

/// Create a test command context in a temporary directory, without a global config
fn create_test_context(temp_dir: &TempDir) -> CommandContext {
    let cwd = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    CommandContext {
        loader: ConfigLoader::new(cwd.clone()).with_global_path(None),
        cwd,
        output: crate::output::OutputHandler::new(),
    }
}

fn no_env() -> Vec<(String, String)> {
    Vec::new()
}

fn package_tarball(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut data = Vec::new();
    {
        let mut builder = tar::Builder::new(GzEncoder::new(&mut data, Compression::default()));
        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(format!("package/{}", path)).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
    data
}

/// Serve a manifest, and its tarball when one is given
async fn publish(server: &MockServer, name: &str, version: &str, types: Option<&str>, archive: Option<Vec<u8>>) {
    let tarball_path = format!("/{}/-/{}.tgz", name, version);
    let mut manifest = serde_json::json!({
        "name": name,
        "version": version,
        "dist": {
            "tarball": format!("{}{}", server.uri(), tarball_path),
            "shasum": archive.as_deref().map(sha1_hex).unwrap_or_default(),
        }
    });
    if let Some(types) = types {
        manifest["types"] = serde_json::Value::String(types.to_string());
    }

    Mock::given(method("GET"))
        .and(path(format!("/{}/{}", name, version)))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
        .mount(server)
        .await;

    if let Some(archive) = archive {
        Mock::given(method("GET"))
            .and(path(tarball_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn scan_args(server: &MockServer) -> SettingsArgs {
    SettingsArgs {
        registry: Some(server.uri()),
        max_attempts: Some(2),
        concurrency: Some(4),
        ..SettingsArgs::default()
    }
}

#[test]
fn test_resolve_relative_and_absolute_paths() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);

    assert_eq!(ctx.resolve(Utf8Path::new("names.json")), ctx.cwd.join("names.json"));
    assert_eq!(ctx.resolve(Utf8Path::new("/tmp/names.json")), Utf8PathBuf::from("/tmp/names.json"));
}

#[tokio::test]
async fn test_load_config_layers_flags_over_project_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("untyped.toml"),
        "[pipeline]\nconcurrency = 8\n\n[paths]\ninput = \"top.json\"\n",
    )
    .unwrap();
    let ctx = create_test_context(&temp_dir);

    let args = SettingsArgs {
        concurrency: Some(2),
        ..SettingsArgs::default()
    };
    let loaded = ctx.load_config_with_env(no_env(), &args).await.unwrap();

    assert_eq!(loaded.config.pipeline.concurrency, 2);
    assert_eq!(loaded.config.paths.input, Utf8PathBuf::from("top.json"));
    assert!(matches!(loaded.sources[0], ConfigSource::Project(_)));
    assert_eq!(
        loaded.sources.last(),
        Some(&ConfigSource::CommandLine("pipeline.concurrency".to_string()))
    );
}

#[tokio::test]
async fn test_invalid_flag_value_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);

    let args = SettingsArgs {
        concurrency: Some(0),
        ..SettingsArgs::default()
    };
    assert!(ctx.load_config_with_env(no_env(), &args).await.is_err());
}

#[test]
fn test_describe_source() {
    assert_eq!(
        check::describe_source(&ConfigSource::Environment("UNTYPED_RETRY_MAX_ATTEMPTS".to_string())),
        "environment: UNTYPED_RETRY_MAX_ATTEMPTS"
    );
    assert_eq!(
        check::describe_source(&ConfigSource::CommandLine("registry.url".to_string())),
        "command line: registry.url"
    );
}

#[tokio::test]
async fn test_scan_writes_untyped_names() {
    let server = MockServer::start().await;
    publish(&server, "left-pad", "1.0.0", Some("index.d.ts"), None).await;
    publish(
        &server,
        "is-odd",
        "3.0.1",
        None,
        Some(package_tarball(&[("package.json", "{}"), ("index.js", "module.exports = 1;")])),
    )
    .await;
    publish(
        &server,
        "@scope/pkg",
        "2.0.0",
        None,
        Some(package_tarball(&[("lib/index.d.ts", "export {};")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("DefinitelyTyped/types/lodash")).unwrap();
    fs::write(
        temp_dir.path().join("raw.json"),
        r#"[
            {"name": "left-pad", "version": "1.0.0"},
            {"name": "is-odd", "version": "3.0.1"},
            {"name": "lodash", "version": "4.17.21"},
            {"name": "@scope/pkg", "version": "2.0.0"},
            {"name": "is-odd", "version": "3.0.1"}
        ]"#,
    )
    .unwrap();
    let ctx = create_test_context(&temp_dir);

    let report = scan::execute(&scan_args(&server), &ctx).await.unwrap();

    assert_eq!(report.untyped, vec!["is-odd".to_string()]);
    assert_eq!(report.stats.covered, 1);
    assert_eq!(report.stats.typed, 2);

    let written = fs::read_to_string(temp_dir.path().join("names.json")).unwrap();
    assert_eq!(written, "[\n  \"is-odd\"\n]\n");
    assert!(temp_dir.path().join(".untyped-cache/is-odd__3.0.1/archive/package/index.js").is_file());

    // Second run is served from the cache; each tarball mock expects one hit
    let again = scan::execute(&scan_args(&server), &ctx).await.unwrap();
    assert_eq!(again.untyped, report.untyped);
    assert_eq!(again.stats.from_cache, 3);
}

#[test]
fn test_floating_note() {
    assert_eq!(scan::floating_note(0), None);
    assert_eq!(
        scan::floating_note(1).as_deref(),
        Some("1 reference has no pinned version and refetches its manifest on every run")
    );
    assert!(scan::floating_note(3).unwrap().starts_with("3 references"));
}

#[tokio::test]
async fn test_floating_ref_refetches_manifest_on_rerun() {
    let server = MockServer::start().await;
    let archive = package_tarball(&[("index.js", "module.exports = 1;")]);
    let shasum = sha1_hex(&archive);
    publish(&server, "is-odd", "3.0.1", None, Some(archive)).await;
    Mock::given(method("GET"))
        .and(path("/is-odd/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "is-odd",
            "version": "3.0.1",
            "dist": {
                "tarball": format!("{}/is-odd/-/3.0.1.tgz", server.uri()),
                "shasum": shasum,
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("raw.json"), r#"[{"name": "is-odd"}]"#).unwrap();
    let ctx = create_test_context(&temp_dir);

    let first = scan::execute(&scan_args(&server), &ctx).await.unwrap();
    let second = scan::execute(&scan_args(&server), &ctx).await.unwrap();

    assert_eq!(first.untyped, vec!["is-odd".to_string()]);
    assert_eq!(second.untyped, first.untyped);
    assert_eq!(second.stats.manifests_fetched, 1);
    assert_eq!(second.stats.archives_extracted, 0);
}

#[tokio::test]
async fn test_not_found_retried_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/1.0.0"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("raw.json"), r#"[{"name": "gone", "version": "1.0.0"}]"#).unwrap();
    let ctx = create_test_context(&temp_dir);

    let args = SettingsArgs {
        retry_not_found: true,
        ..scan_args(&server)
    };
    let err = scan::execute(&args, &ctx).await.unwrap_err();
    assert!(matches!(err, UntypedError::RetriesExhausted { attempts: 2, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_failed_scan_writes_no_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/1.0.0"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("raw.json"), r#"[{"name": "gone", "version": "1.0.0"}]"#).unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = scan::execute(&scan_args(&server), &ctx).await.unwrap_err();
    assert!(matches!(err, UntypedError::PackageNotFound { .. }));
    assert!(!temp_dir.path().join("names.json").exists());
}

#[tokio::test]
async fn test_scan_rejects_null_name() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("raw.json"), r#"[{"name": null, "version": "1.0.0"}]"#).unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = scan::execute(&scan_args(&server), &ctx).await.unwrap_err();
    assert!(matches!(err, UntypedError::InvalidInput { index: 0, .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_input_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = scan::execute(&SettingsArgs::default(), &ctx).await.unwrap_err();
    assert!(matches!(err, UntypedError::Io { .. }));
}

#[tokio::test]
async fn test_clean_removes_cache_entries() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cache = temp_dir.path().join("cache");
    fs::create_dir_all(cache.join("left-pad__1.0.0/archive")).unwrap();
    fs::create_dir_all(cache.join("scope__pkg__2.0.0")).unwrap();
    let ctx = create_test_context(&temp_dir);

    let args = SettingsArgs {
        cache_dir: Some("cache".to_string()),
        ..SettingsArgs::default()
    };
    assert_eq!(clean::execute(&args, &ctx).await.unwrap(), 2);
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);
    assert_eq!(clean::execute(&args, &ctx).await.unwrap(), 0);
}

//! Scan command implementation.
//!
//! Reads the input snapshot, runs the detection pipeline and writes the
//! untyped names as a pretty-printed JSON array. The output file is only
//! written when the whole run succeeds.
//!
//! Only pinned references (an exact semver version) are answered from the
//! cache on a rerun. A dist-tag such as `latest`, or a record without a
//! version, fetches its manifest on every run because the tag can move.

use camino::Utf8Path;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::info;

use untyped_cache::{ArchiveExtractor, DirectoryCoverage, FsCacheStore};
use untyped_config::UntypedToml;
use untyped_core::error::{UntypedError, UntypedResult};
use untyped_core::parse_input;
use untyped_engine::{Pipeline, RunReport};
use untyped_registry::RegistryClient;

use super::CommandContext;
use crate::output::progress::ProgressBar;
use crate::SettingsArgs;

pub async fn execute(args: &SettingsArgs, ctx: &CommandContext) -> UntypedResult<RunReport> {
    let loaded = ctx.load_config(args).await?;
    let show_progress = std::io::stderr().is_terminal();
    run(&loaded.config, ctx, show_progress).await
}

/// Run a scan with an already resolved configuration
pub async fn run(config: &UntypedToml, ctx: &CommandContext, show_progress: bool) -> UntypedResult<RunReport> {
    let input_path = ctx.resolve(&config.paths.input);
    let output_path = ctx.resolve(&config.paths.output);

    let content = tokio::fs::read_to_string(&input_path)
        .await
        .map_err(|e| UntypedError::io(format!("Failed to read input {}", input_path), e))?;
    let refs = parse_input(&content)?;
    let floating = refs.iter().filter(|package| !package.is_pinned()).count();
    info!(input = %input_path, references = refs.len(), floating, "Loaded input");

    let pipeline = build_pipeline(config, ctx, show_progress)?;
    let report = pipeline.run(refs).await?;

    write_names(&output_path, &report.untyped).await?;

    ctx.output.success(&format!(
        "{} of {} packages ship no type declarations; wrote {}",
        report.stats.untyped, report.stats.unique, output_path
    ));
    if let Some(note) = floating_note(floating) {
        ctx.output.info(&note);
    }
    Ok(report)
}

/// Reminder that floating references are never served from the cache alone
pub fn floating_note(floating: usize) -> Option<String> {
    match floating {
        0 => None,
        1 => Some("1 reference has no pinned version and refetches its manifest on every run".to_string()),
        n => Some(format!(
            "{} references have no pinned version and refetch their manifests on every run",
            n
        )),
    }
}

fn build_pipeline(config: &UntypedToml, ctx: &CommandContext, show_progress: bool) -> UntypedResult<Pipeline> {
    let retry_policy = config.retry.retry_policy();
    let registry = Arc::new(RegistryClient::with_config(
        config.registry.client_config(),
        retry_policy.clone(),
    )?);

    let extractor = ArchiveExtractor::new(registry.clone(), retry_policy);
    let cache = FsCacheStore::new(ctx.resolve(&config.paths.cache_dir), extractor);
    let coverage = DirectoryCoverage::open(ctx.resolve(&config.paths.coverage_dir));

    let mut pipeline = Pipeline::new(Arc::new(coverage), Arc::new(cache), registry)
        .with_concurrency(config.pipeline.concurrency);
    if show_progress {
        pipeline = pipeline.with_observer(Arc::new(ProgressBar::new("Scanning")));
    }
    Ok(pipeline)
}

/// Write names as a pretty-printed JSON array
async fn write_names(path: &Utf8Path, names: &[String]) -> UntypedResult<()> {
    let mut body = serde_json::to_string_pretty(names).map_err(|e| UntypedError::JsonParse {
        message: format!("Failed to serialize output: {}", e),
    })?;
    body.push('\n');

    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| UntypedError::io(format!("Failed to create {}", parent), e))?;
    }

    tokio::fs::write(path, body)
        .await
        .map_err(|e| UntypedError::io(format!("Failed to write {}", path), e))
}

//! Check command implementation.
//!
//! Resolves and validates the layered configuration, then prints the result
//! as TOML along with the layers that contributed to it.

use untyped_config::toml::serialize_untyped_toml;
use untyped_config::ConfigSource;
use untyped_core::error::UntypedResult;

use super::CommandContext;
use crate::SettingsArgs;

pub async fn execute(args: &SettingsArgs, ctx: &CommandContext) -> UntypedResult<()> {
    let loaded = ctx.load_config(args).await?;

    ctx.output.print(&serialize_untyped_toml(&loaded.config)?);

    if loaded.sources.is_empty() {
        ctx.output.info("Using built-in defaults");
    }
    for source in &loaded.sources {
        ctx.output.info(&describe_source(source));
    }

    ctx.output.success("Configuration is valid");
    Ok(())
}

/// One-line description of a configuration layer
pub fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Global(path) => format!("global config: {}", path),
        ConfigSource::Project(path) => format!("project config: {}", path),
        ConfigSource::Environment(var) => format!("environment: {}", var),
        ConfigSource::CommandLine(key) => format!("command line: {}", key),
    }
}

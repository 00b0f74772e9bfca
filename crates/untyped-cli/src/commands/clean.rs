//! Clean command implementation.

use untyped_core::error::UntypedResult;

use super::CommandContext;
use crate::SettingsArgs;

/// Remove every cache entry, returning how many were removed
pub async fn execute(args: &SettingsArgs, ctx: &CommandContext) -> UntypedResult<usize> {
    let loaded = ctx.load_config(args).await?;
    let cache_dir = ctx.resolve(&loaded.config.paths.cache_dir);

    let removed = untyped_cache::clear_cache(cache_dir.as_std_path()).await?;

    ctx.output
        .success(&format!("Removed {} cache entries from {}", removed, cache_dir));
    Ok(removed)
}

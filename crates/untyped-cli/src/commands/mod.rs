//! Command implementations and dispatch logic.
//!
//! This module contains all command handlers and the central dispatch system.
//! Each command is implemented as an async function that takes a CommandContext.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tracing::info;

use untyped_config::{ConfigLoader, LoadedConfig};
use untyped_core::error::{UntypedError, UntypedResult};

pub mod check;
pub mod clean;
pub mod scan;
pub mod version;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Commands, SettingsArgs};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    pub loader: ConfigLoader,
}

impl CommandContext {
    /// Create a new command context
    pub async fn new() -> UntypedResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| UntypedError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| UntypedError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("current directory is not valid UTF-8: {}", e),
        })?;

        Ok(Self {
            loader: ConfigLoader::new(cwd.clone()),
            cwd,
            output: OutputHandler::new(),
        })
    }

    /// Resolve configuration from files, the process environment and `args`
    pub async fn load_config(&self, args: &SettingsArgs) -> UntypedResult<LoadedConfig> {
        self.load_config_with_env(std::env::vars(), args).await
    }

    pub async fn load_config_with_env<I>(&self, env: I, args: &SettingsArgs) -> UntypedResult<LoadedConfig>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: BTreeMap<String, String> = args.overrides();
        self.loader.load(env, &overrides).await
    }

    /// Resolve a configured path against the working directory
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> UntypedResult<()> {
    match command {
        Commands::Scan(args) => {
            info!("Scanning for untyped packages");
            scan::execute(&args, ctx).await.map(|_| ())
        },
        Commands::Check(args) => {
            info!("Checking configuration");
            check::execute(&args, ctx).await
        },
        Commands::Clean(args) => {
            info!("Cleaning cache");
            clean::execute(&args, ctx).await.map(|_| ())
        },
        Commands::Version => version::execute(ctx).await,
    }
}

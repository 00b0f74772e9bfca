//! # untyped-cli
//!
//! Finds popular npm packages that ship no TypeScript declarations.
//!
//! This is the main entry point for the `untyped` tool. It handles command
//! parsing, sets up logging and error handling, and dispatches to the
//! appropriate command handlers.

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use untyped_core::error::{UntypedError, UntypedResult};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Find popular npm packages that ship no TypeScript declarations
#[derive(Parser, Debug)]
#[command(name = "untyped", version, about = "Find npm packages without type declarations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify the input list and write the untyped names (default)
    Scan(SettingsArgs),
    /// Validate and print the resolved configuration
    Check(SettingsArgs),
    /// Remove every cache entry
    Clean(SettingsArgs),
    /// Show version information
    Version,
}

/// Command-line overrides for untyped.toml settings
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Input JSON list of { name, version } records; records without an
    /// exact version refetch their manifest on every run
    #[arg(long, value_name = "PATH")]
    pub input: Option<String>,

    /// Where to write the untyped names
    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,

    /// Archive cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<String>,

    /// Directory with one entry per package with published declarations
    #[arg(long, value_name = "DIR")]
    pub coverage_dir: Option<String>,

    /// Registry base URL
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Packages processed at once
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Attempts per fetch or extraction; 0 retries forever
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Retry 404 responses instead of stopping at the first missing package
    #[arg(long)]
    pub retry_not_found: bool,
}

impl SettingsArgs {
    /// Overrides keyed by setting name
    pub fn overrides(&self) -> BTreeMap<String, String> {
        let mut overrides = BTreeMap::new();
        let mut set = |setting: &str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(setting.to_string(), value);
            }
        };

        set("paths.input", self.input.clone());
        set("paths.output", self.output.clone());
        set("paths.cache_dir", self.cache_dir.clone());
        set("paths.coverage_dir", self.coverage_dir.clone());
        set("registry.url", self.registry.clone());
        set("pipeline.concurrency", self.concurrency.map(|n| n.to_string()));
        set("retry.max_attempts", self.max_attempts.map(|n| n.to_string()));
        if self.retry_not_found {
            set("registry.retry_not_found", Some("true".to_string()));
        }

        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_json);
    setup_panic_handler();

    debug!("Starting untyped v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "Run failed");
            eprint!("{}", ErrorFormatter::new().format_error(&error));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> UntypedResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| UntypedError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new().await?;
        let command = cli.command.unwrap_or_else(|| Commands::Scan(SettingsArgs::default()));
        commands::dispatch_command(command, &ctx).await
    })
}

fn setup_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("untyped=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("untyped=info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("untyped encountered an unexpected error: {}", panic_info);
        eprintln!("untyped crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/untyped-rs/untyped/issues");
        eprintln!("Error: {}", panic_info);
    }));
}

//! Configuration layering, file discovery and environment overrides
//!
//! Layers, lowest priority first: built-in defaults, the global
//! `~/.untyped/config.toml`, the project `untyped.toml`, `UNTYPED_*`
//! environment variables and command-line flags. File layers are merged
//! key by key, so a file only needs the settings it changes.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use untyped_core::error::UntypedError;

use crate::toml::{from_table, load_table, validate_config, UntypedToml};
use crate::ConfigResult;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "untyped.toml";

/// Prefix of environment variables that override configuration
pub const ENV_PREFIX: &str = "UNTYPED_";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Global config location; `None` skips the global layer
    global_path: Option<Utf8PathBuf>,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project untyped.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag, by setting name
    CommandLine(String),
}

/// A resolved configuration and the layers that contributed to it
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: UntypedToml,
    pub sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a configuration loader rooted at `cwd`
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            global_path: default_global_path(),
        }
    }

    /// Use `path` as the global config instead of `~/.untyped/config.toml`
    pub fn with_global_path(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Resolve the full configuration.
    ///
    /// `env` is the process environment (or a stand-in for it); only
    /// `UNTYPED_*` entries are considered.
    pub async fn load<I>(&self, env: I, cli_overrides: &BTreeMap<String, String>) -> ConfigResult<LoadedConfig>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut sources = Vec::new();
        let mut table = toml::Table::new();

        if let Some(global) = self.global_path.as_deref().filter(|path| path.is_file()) {
            merge_tables(&mut table, load_table(global).await?);
            sources.push(ConfigSource::Global(global.to_path_buf()));
        }

        if let Some(project) = self.resolve_config_path(PROJECT_CONFIG_FILE) {
            merge_tables(&mut table, load_table(&project).await?);
            sources.push(ConfigSource::Project(project));
        }

        let config = ConfigLayering::merge_configs(
            from_table(table)?,
            ConfigLayering::collect_env_overrides(env),
            cli_overrides,
            &mut sources,
        )?;

        debug!(?sources, "Resolved configuration");
        Ok(LoadedConfig { config, sources })
    }
}

/// Default global config location
fn default_global_path() -> Option<Utf8PathBuf> {
    let home_dir = dirs::home_dir()?;
    let home_dir = Utf8PathBuf::try_from(home_dir).ok()?;
    Some(home_dir.join(".untyped").join("config.toml"))
}

/// Merge `overlay` into `base`, recursing into tables
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, toml::Value::Table(incoming));
            },
            value => {
                base.insert(key, value);
            },
        }
    }
}

/// Configuration layering and merging
pub struct ConfigLayering;

impl ConfigLayering {
    /// Apply environment and CLI overrides to a file-based configuration, then validate it
    pub fn merge_configs(
        file_config: UntypedToml,
        env_overrides: BTreeMap<String, String>,
        cli_overrides: &BTreeMap<String, String>,
        sources: &mut Vec<ConfigSource>,
    ) -> ConfigResult<UntypedToml> {
        let mut merged = file_config;

        // Apply environment variable overrides
        for (var, value) in &env_overrides {
            let Some(setting) = setting_for_env(var) else {
                continue;
            };
            if apply_override(&mut merged, &setting, value, var)? {
                sources.push(ConfigSource::Environment(var.clone()));
            }
        }

        // Apply CLI flag overrides (highest priority)
        for (setting, value) in cli_overrides {
            let known = apply_override(&mut merged, setting, value, setting)?;
            if !known {
                return Err(UntypedError::ConfigValidation {
                    field: setting.clone(),
                    reason: "unknown setting".to_string(),
                });
            }
            sources.push(ConfigSource::CommandLine(setting.clone()));
        }

        validate_config(&merged)?;
        Ok(merged)
    }

    /// Collect `UNTYPED_*` environment variable overrides
    pub fn collect_env_overrides<I>(vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter().filter(|(key, _)| key.starts_with(ENV_PREFIX)).collect()
    }
}

/// `UNTYPED_RETRY_MAX_ATTEMPTS` -> `retry.max_attempts`
fn setting_for_env(var: &str) -> Option<String> {
    let rest = var.strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
    let (section, field) = rest.split_once('_')?;
    Some(format!("{}.{}", section, field))
}

fn parse_value<T>(value: &str, origin: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| UntypedError::ConfigValidation {
        field: origin.to_string(),
        reason: format!("invalid value '{}': {}", value, e),
    })
}

/// Set one dotted setting. Returns false if the setting does not exist.
fn apply_override(config: &mut UntypedToml, setting: &str, value: &str, origin: &str) -> ConfigResult<bool> {
    match setting {
        "registry.url" => config.registry.url = value.to_string(),
        "registry.timeout_secs" => config.registry.timeout_secs = parse_value(value, origin)?,
        "registry.connect_timeout_secs" => config.registry.connect_timeout_secs = parse_value(value, origin)?,
        "registry.user_agent" => config.registry.user_agent = value.to_string(),
        "registry.retry_not_found" => config.registry.retry_not_found = parse_value(value, origin)?,
        "retry.max_attempts" => config.retry.max_attempts = parse_value(value, origin)?,
        "retry.initial_delay_ms" => config.retry.initial_delay_ms = parse_value(value, origin)?,
        "retry.max_delay_ms" => config.retry.max_delay_ms = parse_value(value, origin)?,
        "retry.multiplier" => config.retry.multiplier = parse_value(value, origin)?,
        "retry.jitter" => config.retry.jitter = parse_value(value, origin)?,
        "paths.input" => config.paths.input = Utf8PathBuf::from(value),
        "paths.output" => config.paths.output = Utf8PathBuf::from(value),
        "paths.cache_dir" => config.paths.cache_dir = Utf8PathBuf::from(value),
        "paths.coverage_dir" => config.paths.coverage_dir = Utf8PathBuf::from(value),
        "pipeline.concurrency" => config.pipeline.concurrency = parse_value(value, origin)?,
        _ => return Ok(false),
    }
    Ok(true)
}

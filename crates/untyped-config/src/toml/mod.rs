//! untyped.toml configuration parsing and serialization

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use untyped_core::error::UntypedError;
use untyped_registry::{ClientConfig, RetryPolicy, DEFAULT_REGISTRY};

use crate::ConfigResult;

/// Complete untyped.toml configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct UntypedToml {
    /// Registry endpoint and transport settings
    pub registry: RegistrySection,
    /// Retry policy for manifest fetches and archive extraction
    pub retry: RetrySection,
    /// Input, output and cache locations
    pub paths: PathsSection,
    /// Pipeline tuning
    pub pipeline: PipelineSection,
}

/// `[registry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    pub url: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Retry 404 responses like other failures instead of ending the run
    pub retry_not_found: bool,
}

/// `[retry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Attempts including the first; 0 retries forever
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

/// `[paths]` section. Relative paths resolve against the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    /// JSON array of `{ name, version? }` records
    pub input: Utf8PathBuf,
    /// Where the untyped names are written
    pub output: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    /// Directory with one entry per package with published declarations
    pub coverage_dir: Utf8PathBuf,
}

/// `[pipeline]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    /// Packages processed at once
    pub concurrency: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            url: DEFAULT_REGISTRY.to_string(),
            timeout_secs: client.timeout.as_secs(),
            connect_timeout_secs: client.connect_timeout.as_secs(),
            user_agent: client.user_agent,
            retry_not_found: client.retry_not_found,
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            jitter: policy.jitter,
        }
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            input: Utf8PathBuf::from("raw.json"),
            output: Utf8PathBuf::from("names.json"),
            cache_dir: Utf8PathBuf::from(".untyped-cache"),
            coverage_dir: Utf8PathBuf::from("DefinitelyTyped/types"),
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self { concurrency: 32 }
    }
}

impl RegistrySection {
    /// Transport settings for the registry client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone(),
            retry_not_found: self.retry_not_found,
        }
    }
}

impl RetrySection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> UntypedError {
    UntypedError::ConfigValidation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Check TOML syntax, reporting the error location
pub fn check_syntax(content: &str) -> ConfigResult<()> {
    content
        .parse::<toml_edit::DocumentMut>()
        .map(|_| ())
        .map_err(|e| UntypedError::TomlParse {
            message: format!("TOML syntax error: {}", e),
        })
}

/// Parse TOML into a raw table, for layering
pub fn parse_table(content: &str) -> ConfigResult<toml::Table> {
    check_syntax(content)?;
    toml::from_str(content).map_err(|e| UntypedError::TomlParse {
        message: format!("TOML parsing error: {}", e),
    })
}

/// Build a configuration from a (possibly partial) table
pub fn from_table(table: toml::Table) -> ConfigResult<UntypedToml> {
    UntypedToml::deserialize(toml::Value::Table(table)).map_err(|e| UntypedError::TomlParse {
        message: format!("TOML parsing error: {}", e),
    })
}

/// Parse TOML string to an UntypedToml configuration
pub fn parse_untyped_toml(content: &str) -> ConfigResult<UntypedToml> {
    let config = from_table(parse_table(content)?)?;
    validate_config(&config)?;
    Ok(config)
}

/// Serialize UntypedToml to TOML string
pub fn serialize_untyped_toml(config: &UntypedToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| UntypedError::TomlParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration values
pub fn validate_config(config: &UntypedToml) -> ConfigResult<()> {
    url::Url::parse(&config.registry.url)
        .map_err(|e| invalid("registry.url", format!("'{}' is not a valid URL: {}", config.registry.url, e)))?;

    if config.registry.timeout_secs == 0 {
        return Err(invalid("registry.timeout_secs", "must be at least 1"));
    }
    if config.registry.connect_timeout_secs == 0 {
        return Err(invalid("registry.connect_timeout_secs", "must be at least 1"));
    }

    if !(config.retry.multiplier >= 1.0 && config.retry.multiplier.is_finite()) {
        return Err(invalid(
            "retry.multiplier",
            format!("must be a finite number of at least 1, got {}", config.retry.multiplier),
        ));
    }
    if config.retry.initial_delay_ms > config.retry.max_delay_ms {
        return Err(invalid(
            "retry.initial_delay_ms",
            format!(
                "{} is larger than retry.max_delay_ms ({})",
                config.retry.initial_delay_ms, config.retry.max_delay_ms
            ),
        ));
    }

    if config.pipeline.concurrency == 0 {
        return Err(invalid("pipeline.concurrency", "must be at least 1"));
    }

    for (field, path) in [
        ("paths.input", &config.paths.input),
        ("paths.output", &config.paths.output),
        ("paths.cache_dir", &config.paths.cache_dir),
        ("paths.coverage_dir", &config.paths.coverage_dir),
    ] {
        if path.as_str().is_empty() {
            return Err(invalid(field, "must not be empty"));
        }
    }

    Ok(())
}

/// Read a TOML file into a raw table
pub async fn load_table(path: &Utf8Path) -> ConfigResult<toml::Table> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| UntypedError::io(format!("Failed to read {}", path), e))?;

    parse_table(&content).map_err(|e| match e {
        UntypedError::TomlParse { message } => UntypedError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}

/// Load and parse untyped.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<UntypedToml> {
    let config = from_table(load_table(path).await?).map_err(|e| match e {
        UntypedError::TomlParse { message } => UntypedError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })?;
    validate_config(&config)?;
    Ok(config)
}

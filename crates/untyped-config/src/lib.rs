//! Configuration for untyped
//!
//! This crate parses and validates `untyped.toml` and layers it with the
//! global config file, `UNTYPED_*` environment variables and command-line
//! overrides into one resolved configuration.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE};
pub use toml::{PathsSection, PipelineSection, RegistrySection, RetrySection, UntypedToml};

use untyped_core::error::UntypedError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, UntypedError>;

//! Error types and result aliases for untyped operations.
//!
//! Provides a unified error type that covers every failure the detection
//! engine can hit, split into the ones it recovers from locally and the
//! ones that end a run.

use thiserror::Error;

/// Unified error type for all untyped operations
#[derive(Error, Debug)]
pub enum UntypedError {
    // Input errors
    #[error("Invalid input record #{index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    #[error("Invalid package reference '{name}@{version}': {reason}")]
    InvalidPackageRef {
        name: String,
        version: String,
        reason: String,
    },

    #[error("Failed to parse JSON: {message}")]
    JsonParse { message: String },

    // Config errors
    #[error("Failed to parse untyped.toml: {message}")]
    TomlParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Package '{name}@{version}' not found in registry")]
    PackageNotFound { name: String, version: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Malformed registry response for {package}: {message}")]
    MalformedResponse { package: String, message: String },

    #[error("{operation} failed after {attempts} attempts")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<UntypedError>,
    },

    // Archive errors
    #[error("Integrity check failed for {package}: expected {expected}, got {actual}")]
    IntegrityFailure {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("Corrupt archive for {package}: {message}")]
    CorruptArchive { package: String, message: String },

    #[error("Refusing unsafe path: {path}")]
    UnsafePath { path: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for untyped operations
pub type UntypedResult<T> = Result<T, UntypedError>;

impl UntypedError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a corrupt-archive error
    pub fn corrupt(package: &str, message: impl Into<String>) -> Self {
        Self::CorruptArchive {
            package: package.to_string(),
            message: message.into(),
        }
    }

    /// Whether a retry of the same operation can succeed.
    ///
    /// Filesystem failures are deliberately excluded: an unwritable cache
    /// must end the run instead of producing a partial result set.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UntypedError::Network { .. }
                | UntypedError::MalformedResponse { .. }
                | UntypedError::IntegrityFailure { .. }
                | UntypedError::CorruptArchive { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            UntypedError::InvalidInput { .. } => {
                Some("Every input record needs a non-empty string 'name'; fix or drop the record and rerun")
            },
            UntypedError::PackageNotFound { .. } => Some(
                "The version may have been unpublished; remove that record from the input list, \
                 or set [registry].retry_not_found = true to treat 404 as transient",
            ),
            UntypedError::Network { .. } | UntypedError::RetriesExhausted { .. } => {
                Some("Check your connection, or raise [retry].max_attempts (0 retries forever)")
            },
            UntypedError::Io { .. } => Some("Check that the cache directory exists and is writable"),
            UntypedError::ConfigValidation { .. } | UntypedError::TomlParse { .. } => {
                Some("Run 'untyped check' to see the resolved configuration")
            },
            _ => None,
        }
    }
}

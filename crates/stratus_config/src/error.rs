//! Error types for configuration loading and lookup.

use std::path::PathBuf;

/// Errors reading or querying configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key has no value.
    #[error("missing required configuration value '{key}'")]
    Missing {
        /// The missing key.
        key: String,
    },

    /// A value could not be interpreted.
    #[error("invalid value for '{key}' ({value:?}): {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON, or not a JSON object.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// The file that was parsed.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Creates an [`Invalid`](Self::Invalid) error.
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

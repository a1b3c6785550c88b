//! Error types for provider calls.

/// Errors returned by a [`Provider`](crate::Provider).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No provider is registered for the package of a resource kind.
    #[error("no provider registered for package '{package}' (kind '{kind}')")]
    UnknownProvider {
        /// The package prefix that was looked up.
        package: String,
        /// The full resource kind.
        kind: String,
    },

    /// The resource kind is not of the form `package:module/type:Type`.
    #[error("malformed resource kind '{0}': expected 'package:module'")]
    MalformedKind(String),

    /// The provider rejected the inputs.
    #[error("invalid inputs: {0}")]
    InvalidInputs(String),

    /// Error reported by the remote API.
    #[error("provider error: {message}")]
    Api {
        /// Provider-specific error code, if available.
        code: Option<String>,
        /// Error message.
        message: String,
        /// The underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProviderError {
    /// Creates an [`Api`](Self::Api) error with only a message.
    #[must_use]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            code: None,
            message: message.into(),
            source: None,
        }
    }
}

//! The [`Provider`] trait for resource provider integrations.

use async_trait::async_trait;
use indexmap::IndexMap;

/// Ordered mapping from field name to a concrete JSON value.
///
/// Used both for the resolved inputs of a creation call and for the fields a
/// provider returns once the resource exists.
pub type Fields = IndexMap<String, serde_json::Value>;

/// A request to create one resource.
///
/// All references in the declared inputs have already been substituted by the
/// evaluator; `inputs` contains only concrete values.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    /// Logical id of the resource within its graph.
    pub id: String,
    /// Opaque provider type tag, e.g. `aws:s3/bucket:Bucket`.
    pub kind: String,
    /// Resolved inputs.
    pub inputs: Fields,
}

impl CreateRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>, inputs: Fields) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            inputs,
        }
    }

    /// Returns the package prefix of the kind (the part before the first `:`).
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.kind.split_once(':').map(|(package, _)| package)
    }
}

/// Trait implemented by provider integrations.
///
/// Retry, authentication and timeouts are the implementation's concern; the
/// evaluator calls [`create`](Self::create) exactly once per resource.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Creates the resource described by `request` and returns its fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`](crate::ProviderError) if the resource could
    /// not be created.
    async fn create(&self, request: CreateRequest) -> Result<Fields, crate::ProviderError>;
}

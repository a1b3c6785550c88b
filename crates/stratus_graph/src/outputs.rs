//! Provider output storage.
//!
//! [`ResolvedOutputs`] holds the fields each provider call returned, keyed by
//! resource id. Entries are written once, by the evaluator's scheduling loop,
//! and are immutable afterwards.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use stratus_provider::Fields;

use crate::resource::ResourceId;
use crate::value::{OutputRef, ResolveError};

/// Errors that can occur when recording outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutputsError {
    /// Outputs for this resource were already recorded.
    #[error("outputs for resource '{0}' were already recorded")]
    AlreadyResolved(ResourceId),
}

/// Write-once table of provider outputs.
///
/// Resources appear in the order they were materialized.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use stratus_graph::{ResolvedOutputs, ResourceId};
///
/// let mut outputs = ResolvedOutputs::new();
/// let fields = [("id".to_string(), json!("spill-1a2b3c4"))].into_iter().collect();
/// outputs.insert(ResourceId::new("spill"), fields).unwrap();
///
/// assert_eq!(outputs.field("spill", "id"), Some(&json!("spill-1a2b3c4")));
/// assert!(outputs.insert(ResourceId::new("spill"), Default::default()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ResolvedOutputs {
    resources: IndexMap<ResourceId, Fields>,
}

impl ResolvedOutputs {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outputs of a materialized resource.
    ///
    /// # Errors
    ///
    /// Returns [`OutputsError::AlreadyResolved`] if the resource already has
    /// recorded outputs; the existing entry is left untouched.
    pub fn insert(&mut self, resource: ResourceId, fields: Fields) -> Result<(), OutputsError> {
        if self.resources.contains_key(&resource) {
            return Err(OutputsError::AlreadyResolved(resource));
        }
        self.resources.insert(resource, fields);
        Ok(())
    }

    /// Returns the outputs of a resource, if it was materialized.
    #[must_use]
    pub fn get(&self, resource: &str) -> Option<&Fields> {
        self.resources.get(resource)
    }

    /// Returns one output field of a resource.
    #[must_use]
    pub fn field(&self, resource: &str, field: &str) -> Option<&JsonValue> {
        self.get(resource).and_then(|fields| fields.get(field))
    }

    /// Returns true if the resource has recorded outputs.
    #[must_use]
    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Looks up the value an [`OutputRef`] points at.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] if the resource or the field is absent.
    pub fn lookup(&self, output: &OutputRef) -> Result<&JsonValue, ResolveError> {
        let fields = self
            .get(output.resource().as_str())
            .ok_or_else(|| ResolveError::Unmaterialized {
                resource: output.resource().clone(),
            })?;

        fields
            .get(output.field())
            .ok_or_else(|| ResolveError::MissingField {
                resource: output.resource().clone(),
                field: output.field().to_string(),
            })
    }

    /// Returns the number of materialized resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing has been materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over resources and their outputs in materialization order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &Fields)> {
        self.resources.iter()
    }
}

//! Named values reported after a provisioning run.
//!
//! Exports are declared up front, usually as [`OutputRef`](crate::value::OutputRef)
//! values that cannot be known yet. Resolution is deferred until evaluation
//! has finished; an export whose resource never reached `Materialized` is
//! reported as unresolved rather than failing the whole table.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::graph::BuildError;
use crate::outputs::ResolvedOutputs;
use crate::resource::ResourceId;
use crate::value::{ResolveError, Value};

/// Errors reading an export after evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    /// The export references a resource that never reached `Materialized`.
    #[error("export '{name}' is unresolved: resource '{resource}' was not materialized")]
    Unresolved {
        /// The export name.
        name: String,
        /// The resource that was never materialized.
        resource: ResourceId,
    },

    /// No export with this name was declared.
    #[error("no export named '{0}'")]
    UnknownExport(String),

    /// The resource was materialized but the value could not be resolved.
    #[error("export '{name}' could not be resolved: {source}")]
    Resolve {
        /// The export name.
        name: String,
        /// The underlying resolution error.
        #[source]
        source: ResolveError,
    },
}

/// Registry of named exports, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ExportRegistry {
    entries: IndexMap<String, Value>,
}

impl ExportRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an export.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateExport`] if the name is already taken.
    pub fn export(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), BuildError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(BuildError::DuplicateExport(name));
        }
        self.entries.insert(name, value.into());
        Ok(())
    }

    /// Returns the declared value of an export.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Iterates over exports in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of exports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves one export against the outputs of an evaluation.
    ///
    /// # Errors
    ///
    /// - [`ExportError::UnknownExport`] if no export has this name
    /// - [`ExportError::Unresolved`] if a referenced resource was not
    ///   materialized
    /// - [`ExportError::Resolve`] for any other resolution failure
    pub fn resolve_one(&self, name: &str, outputs: &ResolvedOutputs) -> Result<JsonValue, ExportError> {
        let value = self
            .entries
            .get(name)
            .ok_or_else(|| ExportError::UnknownExport(name.to_string()))?;

        value.resolve(outputs).map_err(|err| match err {
            ResolveError::Unmaterialized { resource } => ExportError::Unresolved {
                name: name.to_string(),
                resource,
            },
            other => ExportError::Resolve {
                name: name.to_string(),
                source: other,
            },
        })
    }

    /// Resolves every export, keeping failures per name.
    #[must_use]
    pub fn resolve(&self, outputs: &ResolvedOutputs) -> ExportTable {
        let mut table = ExportTable::default();
        for name in self.entries.keys() {
            match self.resolve_one(name, outputs) {
                Ok(value) => {
                    table.values.insert(name.clone(), value);
                }
                Err(err) => {
                    tracing::warn!(export = %name, error = %err, "export unresolved");
                    table.errors.insert(name.clone(), err);
                }
            }
        }
        table
    }
}

/// Exports resolved after evaluation.
///
/// Serializes as a flat JSON object containing only the resolved entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    values: IndexMap<String, JsonValue>,
    errors: IndexMap<String, ExportError>,
}

impl ExportTable {
    /// Returns the concrete value of an export.
    ///
    /// # Errors
    ///
    /// Returns the export's resolution error, or
    /// [`ExportError::UnknownExport`] if no such export was declared.
    pub fn get(&self, name: &str) -> Result<&JsonValue, ExportError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value);
        }
        Err(self
            .errors
            .get(name)
            .cloned()
            .unwrap_or_else(|| ExportError::UnknownExport(name.to_string())))
    }

    /// Returns the resolved exports in declaration order.
    #[must_use]
    pub fn values(&self) -> &IndexMap<String, JsonValue> {
        &self.values
    }

    /// Returns the exports that could not be resolved.
    #[must_use]
    pub fn errors(&self) -> &IndexMap<String, ExportError> {
        &self.errors
    }

    /// Returns true if every export resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the resolved exports as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

impl serde::Serialize for ExportTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

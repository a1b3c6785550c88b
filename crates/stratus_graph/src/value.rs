//! Input values and output references.
//!
//! A [`Value`] is either fully known at declaration time (a literal) or
//! contains [`OutputRef`] placeholders for values that only exist once the
//! referenced resource has been created. The dependency graph is derived from
//! these placeholders, and the evaluator substitutes them with concrete values
//! from [`ResolvedOutputs`] just before each provider call.

use core::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::outputs::ResolvedOutputs;
use crate::resource::ResourceId;

/// Placeholder for a field of a resource that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRef {
    resource: ResourceId,
    field: String,
}

impl OutputRef {
    /// Creates a reference to `field` of `resource`.
    #[must_use]
    pub fn new(resource: impl Into<ResourceId>, field: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            field: field.into(),
        }
    }

    /// Returns the referenced resource id.
    #[must_use]
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// Returns the referenced output field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.field)
    }
}

/// A resource input or export value.
///
/// `Literal` and `OutputRef` are the two fundamental forms. The remaining
/// variants are containers that let references appear inside structured
/// inputs and string templates; they are scanned recursively when the graph
/// is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A value known at declaration time.
    Literal(JsonValue),
    /// A field of another resource, known only after it is created.
    OutputRef(OutputRef),
    /// A list whose elements may contain references.
    List(Vec<Value>),
    /// An ordered mapping whose values may contain references.
    Map(IndexMap<String, Value>),
    /// String template: the rendered parts are concatenated.
    Concat(Vec<Value>),
    /// The resolved inner value, serialized as a compact JSON string.
    Json(Box<Value>),
}

impl Value {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a reference to `field` of `resource`.
    #[must_use]
    pub fn output(resource: impl Into<ResourceId>, field: impl Into<String>) -> Self {
        Self::OutputRef(OutputRef::new(resource, field))
    }

    /// Creates a list value.
    #[must_use]
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Creates a map value, preserving entry order.
    #[must_use]
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Creates a string template from parts.
    ///
    /// ```
    /// use stratus_graph::Value;
    ///
    /// let resource = Value::concat([Value::output("spill", "arn"), "/*".into()]);
    /// assert!(!resource.is_known());
    /// ```
    #[must_use]
    pub fn concat<V: Into<Value>>(parts: impl IntoIterator<Item = V>) -> Self {
        Self::Concat(parts.into_iter().map(Into::into).collect())
    }

    /// Wraps a value so that it resolves to its compact JSON serialization.
    #[must_use]
    pub fn json(inner: impl Into<Value>) -> Self {
        Self::Json(Box::new(inner.into()))
    }

    /// Returns true if the value contains no output references.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.references().next().is_none()
    }

    /// Returns every output reference in this value, depth-first.
    pub fn references(&self) -> impl Iterator<Item = &OutputRef> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs.into_iter()
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a OutputRef>) {
        match self {
            Value::Literal(_) => {}
            Value::OutputRef(output) => refs.push(output),
            Value::List(items) | Value::Concat(items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(refs);
                }
            }
            Value::Json(inner) => inner.collect_references(refs),
        }
    }

    /// Substitutes every reference with its concrete value.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] if a referenced resource has no recorded
    /// outputs or lacks the referenced field.
    pub fn resolve(&self, outputs: &ResolvedOutputs) -> Result<JsonValue, ResolveError> {
        match self {
            Value::Literal(value) => Ok(value.clone()),
            Value::OutputRef(output) => outputs.lookup(output).cloned(),
            Value::List(items) => items
                .iter()
                .map(|item| item.resolve(outputs))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            Value::Map(entries) => {
                let mut object = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    object.insert(key.clone(), value.resolve(outputs)?);
                }
                Ok(JsonValue::Object(object))
            }
            Value::Concat(parts) => {
                let mut rendered = String::new();
                for part in parts {
                    match part.resolve(outputs)? {
                        JsonValue::String(text) => rendered.push_str(&text),
                        other => rendered.push_str(&other.to_string()),
                    }
                }
                Ok(JsonValue::String(rendered))
            }
            Value::Json(inner) => {
                let resolved = inner.resolve(outputs)?;
                serde_json::to_string(&resolved)
                    .map(JsonValue::String)
                    .map_err(|err| ResolveError::Serialize(err.to_string()))
            }
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Literal(JsonValue::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Literal(JsonValue::String(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Literal(JsonValue::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Literal(value.into())
    }
}

impl From<OutputRef> for Value {
    fn from(value: OutputRef) -> Self {
        Self::OutputRef(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// Errors that can occur while substituting output references.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// The referenced resource has not been materialized.
    #[error("resource '{resource}' has not been materialized")]
    Unmaterialized {
        /// The referenced resource.
        resource: ResourceId,
    },

    /// The referenced resource exists but did not return the field.
    #[error("resource '{resource}' has no output field '{field}'")]
    MissingField {
        /// The referenced resource.
        resource: ResourceId,
        /// The missing field.
        field: String,
    },

    /// A resolved value could not be serialized.
    #[error("failed to serialize resolved value: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs() -> ResolvedOutputs {
        let mut outputs = ResolvedOutputs::new();
        outputs
            .insert(
                ResourceId::new("spill"),
                [
                    ("arn".to_string(), json!("arn:aws:s3:::spill-1234")),
                    ("id".to_string(), json!("spill-1234")),
                ]
                .into_iter()
                .collect(),
            )
            .unwrap();
        outputs
            .insert(
                ResourceId::new("identity"),
                [("accountId".to_string(), json!(123_456))]
                    .into_iter()
                    .collect(),
            )
            .unwrap();
        outputs
    }

    #[test]
    fn literal_resolves_unchanged() {
        let value = Value::literal(json!({"a": [1, 2, {"b": null}]}));
        assert_eq!(
            value.resolve(&ResolvedOutputs::new()).unwrap(),
            json!({"a": [1, 2, {"b": null}]})
        );
    }

    #[test]
    fn output_ref_substitutes_field() {
        let value = Value::output("spill", "id");
        assert_eq!(value.resolve(&outputs()).unwrap(), json!("spill-1234"));
    }

    #[test]
    fn concat_renders_strings_verbatim_and_scalars_as_json() {
        let value = Value::concat([
            Value::from("arn:aws:lambda:eu-central-1:"),
            Value::output("identity", "accountId"),
            Value::from(":function:orders-lambda"),
        ]);

        assert_eq!(
            value.resolve(&outputs()).unwrap(),
            json!("arn:aws:lambda:eu-central-1:123456:function:orders-lambda")
        );
    }

    #[test]
    fn json_serializes_resolved_structure() {
        let value = Value::json(Value::map([
            ("Version", Value::from("2012-10-17")),
            (
                "Resource",
                Value::concat([Value::output("spill", "arn"), Value::from("/*")]),
            ),
        ]));

        let resolved = value.resolve(&outputs()).unwrap();
        assert_eq!(
            resolved,
            json!(r#"{"Version":"2012-10-17","Resource":"arn:aws:s3:::spill-1234/*"}"#)
        );
    }

    #[test]
    fn unmaterialized_resource_is_an_error() {
        let value = Value::list([Value::output("role", "arn")]);
        let err = value.resolve(&outputs()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Unmaterialized {
                resource: ResourceId::new("role")
            }
        );
    }

    #[test]
    fn missing_field_is_an_error() {
        let err = Value::output("spill", "region")
            .resolve(&outputs())
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingField { ref field, .. } if field == "region"));
    }

    #[test]
    fn is_known_detects_nested_references() {
        assert!(Value::map([("a", Value::from(1_i64))]).is_known());
        assert!(!Value::json(Value::list([Value::output("x", "y")])).is_known());
    }

    #[test]
    fn output_ref_display() {
        assert_eq!(OutputRef::new("spill", "arn").to_string(), "spill.arn");
    }
}

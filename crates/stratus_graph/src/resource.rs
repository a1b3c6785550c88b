//! Resource declarations.
//!
//! A [`ResourceDescriptor`] is the immutable description of one external
//! entity to create: its logical id, an opaque provider kind, its inputs and
//! any explicit dependencies. Descriptors are the vertices of a
//! [`DependencyGraph`](crate::graph::DependencyGraph).

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::value::{OutputRef, Value};

/// Logical identifier of a resource, unique within one graph.
///
/// Internally uses `Arc<str>` for cheap cloning (reference count bump only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
    /// Creates a resource ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(id: &ResourceId) -> Self {
        id.clone()
    }
}

impl From<&ResourceHandle> for ResourceId {
    fn from(handle: &ResourceHandle) -> Self {
        handle.id.clone()
    }
}

impl serde::Serialize for ResourceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Declaration of one external resource.
///
/// Built with a fluent API and handed to [`Stack::declare`](crate::stack::Stack::declare).
/// Inputs may embed [`OutputRef`] values pointing at resources that have not
/// been declared yet; references are only checked when the graph is built.
///
/// # Example
///
/// ```
/// use stratus_graph::{ResourceDescriptor, Value};
///
/// let policy = ResourceDescriptor::new("inline", "aws:iam/rolePolicy:RolePolicy")
///     .with_input("role", Value::output("role", "id"))
///     .depends_on("bucket");
///
/// assert_eq!(policy.references().count(), 1);
/// assert_eq!(policy.explicit_dependencies().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    id: ResourceId,
    kind: String,
    inputs: IndexMap<String, Value>,
    depends_on: IndexSet<ResourceId>,
}

impl ResourceDescriptor {
    /// Creates a descriptor with no inputs and no explicit dependencies.
    #[must_use]
    pub fn new(id: impl Into<ResourceId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            inputs: IndexMap::new(),
            depends_on: IndexSet::new(),
        }
    }

    /// Sets an input value, replacing any previous value for `name`.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Sets several input values at once.
    #[must_use]
    pub fn with_inputs<K, V>(mut self, inputs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.inputs
            .extend(inputs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Adds an explicit "must exist before" dependency.
    #[must_use]
    pub fn depends_on(mut self, id: impl Into<ResourceId>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    /// Returns the logical id.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns the provider kind tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the declared inputs in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &IndexMap<String, Value> {
        &self.inputs
    }

    /// Returns one declared input.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Returns the explicitly declared dependencies.
    pub fn explicit_dependencies(&self) -> impl Iterator<Item = &ResourceId> {
        self.depends_on.iter()
    }

    /// Returns every output reference embedded in the inputs, depth-first.
    pub fn references(&self) -> impl Iterator<Item = &OutputRef> {
        self.inputs.values().flat_map(Value::references)
    }

    /// Returns a reference to one of this resource's future outputs.
    #[must_use]
    pub fn output(&self, field: impl Into<String>) -> Value {
        Value::output(self.id.clone(), field)
    }
}

/// Handle returned when a resource is declared on a [`Stack`](crate::stack::Stack).
///
/// Used to reference the resource's outputs from other declarations and
/// exports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: ResourceId,
}

impl ResourceHandle {
    pub(crate) fn new(id: ResourceId) -> Self {
        Self { id }
    }

    /// Returns the logical id of the declared resource.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns a reference to one of the resource's future outputs.
    #[must_use]
    pub fn output(&self, field: impl Into<String>) -> Value {
        Value::output(self.id.clone(), field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_display() {
        let id = ResourceId::new("orders-spill");
        assert_eq!(format!("{id}"), "orders-spill");
    }

    #[test]
    fn resource_id_equality() {
        let id1 = ResourceId::from("a");
        let id2 = ResourceId::from("a".to_string());
        let id3 = ResourceId::from("b");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn resource_id_borrows_as_str() {
        let mut map = hashbrown::HashMap::new();
        map.insert(ResourceId::new("bucket"), 1);
        assert_eq!(map.get("bucket"), Some(&1));
    }

    #[test]
    fn descriptor_collects_nested_references() {
        let descriptor = ResourceDescriptor::new("stack", "aws:serverlessrepository/x:X")
            .with_input("bucket", Value::output("spill", "id"))
            .with_input(
                "parameters",
                Value::map([
                    ("SpillBucket", Value::output("spill", "id")),
                    ("Role", Value::output("role", "arn")),
                ]),
            );

        let refs: Vec<_> = descriptor
            .references()
            .map(|r| (r.resource().as_str(), r.field()))
            .collect();
        assert_eq!(
            refs,
            vec![("spill", "id"), ("spill", "id"), ("role", "arn")]
        );
    }

    #[test]
    fn with_input_replaces_previous_value() {
        let descriptor = ResourceDescriptor::new("bucket", "aws:s3/bucket:Bucket")
            .with_input("acl", "private")
            .with_input("acl", "public-read");

        assert_eq!(descriptor.inputs().len(), 1);
        assert_eq!(descriptor.input("acl"), Some(&Value::from("public-read")));
    }

    #[test]
    fn explicit_dependencies_are_deduplicated() {
        let descriptor = ResourceDescriptor::new("catalog", "aws:athena/dataCatalog:DataCatalog")
            .depends_on("connector")
            .depends_on("connector");

        assert_eq!(descriptor.explicit_dependencies().count(), 1);
    }

    #[test]
    fn handle_output_builds_reference() {
        let handle = ResourceHandle::new(ResourceId::new("role"));
        let value = handle.output("name");

        let refs: Vec<_> = value.references().collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].resource().as_str(), "role");
        assert_eq!(refs[0].field(), "name");
    }
}

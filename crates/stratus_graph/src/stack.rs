//! Declaration context for one provisioning run.

use hashbrown::HashSet;

use crate::exports::ExportRegistry;
use crate::graph::{BuildError, DependencyGraph};
use crate::resource::{ResourceDescriptor, ResourceHandle, ResourceId};
use crate::value::Value;

/// Owns the resources and exports declared for one provisioning run.
///
/// A stack is created per run and discarded once its results have been read;
/// nothing about it is shared implicitly between runs.
///
/// # Example
///
/// ```
/// use stratus_graph::{ResourceDescriptor, Stack, Value};
///
/// let mut stack = Stack::new("dev");
/// let bucket = stack
///     .declare(ResourceDescriptor::new("spill", "aws:s3/bucket:Bucket"))
///     .unwrap();
/// stack.export("spill_bucket", bucket.output("id")).unwrap();
///
/// let graph = stack.build().unwrap();
/// assert_eq!(graph.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Stack {
    name: String,
    resources: Vec<ResourceDescriptor>,
    ids: HashSet<ResourceId>,
    exports: ExportRegistry,
}

impl Stack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a resource.
    ///
    /// References inside the descriptor are not inspected here, so resources
    /// may be declared in any order relative to the resources they reference.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateId`] if a resource with the same id was
    /// already declared.
    pub fn declare(&mut self, descriptor: ResourceDescriptor) -> Result<ResourceHandle, BuildError> {
        if !self.ids.insert(descriptor.id().clone()) {
            return Err(BuildError::DuplicateId(descriptor.id().clone()));
        }

        tracing::trace!(resource = %descriptor.id(), kind = descriptor.kind(), "declared");
        let handle = ResourceHandle::new(descriptor.id().clone());
        self.resources.push(descriptor);
        Ok(handle)
    }

    /// Registers a named export.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateExport`] if the name is already taken.
    pub fn export(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), BuildError> {
        self.exports.export(name, value)
    }

    /// Returns the declared resources in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Gets a declared resource by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|descriptor| descriptor.id().as_str() == id)
    }

    /// Returns the export registry.
    #[must_use]
    pub fn exports(&self) -> &ExportRegistry {
        &self.exports
    }

    /// Returns the number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resources are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Builds the dependency graph and checks export references.
    ///
    /// # Errors
    ///
    /// Returns any error of [`DependencyGraph::build`], or
    /// [`BuildError::UnknownReference`] if an export references an undeclared
    /// resource.
    pub fn build(&self) -> Result<DependencyGraph, BuildError> {
        let graph = DependencyGraph::build(self.resources.iter().cloned())?;

        for (name, value) in self.exports.iter() {
            if let Some(output) = value
                .references()
                .find(|output| !graph.contains(output.resource().as_str()))
            {
                return Err(BuildError::UnknownReference {
                    resource: format!("export '{name}'"),
                    referenced: output.resource().clone(),
                    field: Some(output.field().to_string()),
                });
            }
        }

        Ok(graph)
    }
}

//! Dependency graph construction.
//!
//! The [`DependencyGraph`] is derived from a sequence of
//! [`ResourceDescriptor`]s. Edges point from a resource to the resources that
//! must wait for it, and come from two sources:
//!
//! - **References**: any [`OutputRef`](crate::value::OutputRef) found while
//!   scanning a descriptor's inputs
//! - **Explicit**: ids listed with [`ResourceDescriptor::depends_on`]
//!
//! Building the graph also computes its topological order. Cycles are
//! detected by that same pass: whatever Kahn's algorithm cannot release is
//! part of, or downstream of, a cycle.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;

use crate::resource::{ResourceDescriptor, ResourceId};

/// Why an edge exists between two resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeReason {
    /// The dependent consumes an output field of the dependency.
    Reference {
        /// The first referenced field found while scanning the inputs.
        field: String,
    },
    /// The dependent listed the dependency in `depends_on`.
    Explicit,
}

/// A "must exist before" relationship: `from` is created before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    /// The dependency.
    pub from: ResourceId,
    /// The dependent resource.
    pub to: ResourceId,
    /// Where the edge was inferred from.
    pub reason: EdgeReason,
}

/// Errors detected while declaring resources or building the graph.
///
/// All of these are raised before any provider call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Two resources share the same id.
    #[error("resource '{0}' is already declared")]
    DuplicateId(ResourceId),

    /// A reference or explicit dependency names an undeclared resource.
    #[error("{}", describe_unknown(.resource, .referenced, .field))]
    UnknownReference {
        /// The resource (or export) holding the reference.
        resource: String,
        /// The undeclared id.
        referenced: ResourceId,
        /// The referenced field, `None` for explicit dependencies.
        field: Option<String>,
    },

    /// The dependency relation contains a cycle.
    #[error("dependency cycle: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// Resources along the cycle in dependency order; the first id is
        /// repeated at the end.
        cycle: Vec<ResourceId>,
    },

    /// Two exports share the same name.
    #[error("export '{0}' is already defined")]
    DuplicateExport(String),
}

fn describe_unknown(resource: &str, referenced: &ResourceId, field: &Option<String>) -> String {
    match field {
        Some(field) => {
            format!("'{resource}' references undeclared resource '{referenced}' (field '{field}')")
        }
        None => format!("'{resource}' depends on undeclared resource '{referenced}'"),
    }
}

fn format_cycle(cycle: &[ResourceId]) -> String {
    cycle
        .iter()
        .map(ResourceId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A validated DAG over resource descriptors.
///
/// Nodes keep their declaration order. The topological order is computed
/// once at build time; ties between independent resources are broken by
/// declaration order, so building the same descriptors always yields the
/// same order.
///
/// # Example
///
/// ```
/// use stratus_graph::{DependencyGraph, ResourceDescriptor, Value};
///
/// let graph = DependencyGraph::build([
///     ResourceDescriptor::new("policy", "test:iam/policy:Policy")
///         .with_input("bucket", Value::output("bucket", "arn")),
///     ResourceDescriptor::new("bucket", "test:s3/bucket:Bucket"),
/// ])
/// .unwrap();
///
/// let order: Vec<_> = graph.topological_order().map(|d| d.id().as_str()).collect();
/// assert_eq!(order, ["bucket", "policy"]);
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Descriptors in declaration order.
    nodes: Vec<ResourceDescriptor>,
    /// Resource id to node index.
    index: HashMap<ResourceId, usize>,
    /// Deduplicated edges keyed by (from, to) node index.
    edges: BTreeMap<(usize, usize), EdgeReason>,
    /// Node indices each node waits for, ascending.
    dependencies: Vec<Vec<usize>>,
    /// Node indices waiting for each node, ascending.
    dependents: Vec<Vec<usize>>,
    /// Topological order as node indices.
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Builds a graph from descriptors given in declaration order.
    ///
    /// # Errors
    ///
    /// - [`BuildError::DuplicateId`] if two descriptors share an id
    /// - [`BuildError::UnknownReference`] if a reference or explicit
    ///   dependency names an id not in `descriptors`
    /// - [`BuildError::CyclicDependency`] if the relation is not acyclic,
    ///   including a resource referencing its own outputs
    pub fn build(
        descriptors: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Result<Self, BuildError> {
        let nodes: Vec<ResourceDescriptor> = descriptors.into_iter().collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (position, descriptor) in nodes.iter().enumerate() {
            if index.insert(descriptor.id().clone(), position).is_some() {
                return Err(BuildError::DuplicateId(descriptor.id().clone()));
            }
        }

        let mut edges = BTreeMap::new();
        for (to, descriptor) in nodes.iter().enumerate() {
            for output in descriptor.references() {
                let from = *index.get(output.resource()).ok_or_else(|| {
                    BuildError::UnknownReference {
                        resource: descriptor.id().to_string(),
                        referenced: output.resource().clone(),
                        field: Some(output.field().to_string()),
                    }
                })?;
                edges.entry((from, to)).or_insert_with(|| EdgeReason::Reference {
                    field: output.field().to_string(),
                });
            }

            for dependency in descriptor.explicit_dependencies() {
                let from =
                    *index
                        .get(dependency)
                        .ok_or_else(|| BuildError::UnknownReference {
                            resource: descriptor.id().to_string(),
                            referenced: dependency.clone(),
                            field: None,
                        })?;
                edges.entry((from, to)).or_insert(EdgeReason::Explicit);
            }
        }

        let mut dependencies = vec![Vec::new(); nodes.len()];
        let mut dependents = vec![Vec::new(); nodes.len()];
        for &(from, to) in edges.keys() {
            dependencies[to].push(from);
            dependents[from].push(to);
        }
        for list in dependencies.iter_mut().chain(dependents.iter_mut()) {
            list.sort_unstable();
        }

        let order = topological_sort(&nodes, &dependencies, &dependents)?;

        tracing::debug!(
            resources = nodes.len(),
            edges = edges.len(),
            "dependency graph built"
        );

        Ok(Self {
            nodes,
            index,
            edges,
            dependencies,
            dependents,
            order,
        })
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns all descriptors in declaration order.
    #[must_use]
    pub fn descriptors(&self) -> &[ResourceDescriptor] {
        &self.nodes
    }

    /// Gets a descriptor by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// Returns true if a resource with this id is in the graph.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Returns every edge, ordered by the declaration position of
    /// `(from, to)`.
    #[must_use]
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.edges
            .iter()
            .map(|(&(from, to), reason)| DependencyEdge {
                from: self.nodes[from].id().clone(),
                to: self.nodes[to].id().clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    /// Returns the number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the resources `id` waits for, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, id: &str) -> Vec<&ResourceId> {
        self.neighbours(id, &self.dependencies)
    }

    /// Returns the resources waiting for `id`, in declaration order.
    #[must_use]
    pub fn dependents_of(&self, id: &str) -> Vec<&ResourceId> {
        self.neighbours(id, &self.dependents)
    }

    fn neighbours<'a>(&'a self, id: &str, adjacency: &'a [Vec<usize>]) -> Vec<&'a ResourceId> {
        self.index
            .get(id)
            .map(|&position| {
                adjacency[position]
                    .iter()
                    .map(|&other| self.nodes[other].id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates over descriptors in topological order.
    pub fn topological_order(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.order.iter().map(|&position| &self.nodes[position])
    }

    pub(crate) fn descriptor_at(&self, position: usize) -> &ResourceDescriptor {
        &self.nodes[position]
    }

    pub(crate) fn dependencies_at(&self, position: usize) -> &[usize] {
        &self.dependencies[position]
    }

    pub(crate) fn dependents_at(&self, position: usize) -> &[usize] {
        &self.dependents[position]
    }
}

/// Kahn's algorithm with the ready set ordered by declaration position.
///
/// On failure, walks backwards through unreleased dependencies from the
/// first unreleased node until a node repeats, which yields one cycle.
fn topological_sort(
    nodes: &[ResourceDescriptor],
    dependencies: &[Vec<usize>],
    dependents: &[Vec<usize>],
) -> Result<Vec<usize>, BuildError> {
    let mut pending: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&n| pending[n] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    // Every unreleased node still has an unreleased dependency.
    let Some(start) = (0..nodes.len()).find(|&n| pending[n] > 0) else {
        return Ok(order);
    };

    let mut path = vec![start];
    let mut seen_at = HashMap::new();
    seen_at.insert(start, 0);
    let mut current = start;
    loop {
        let Some(&previous) = dependencies[current].iter().find(|&&d| pending[d] > 0) else {
            break;
        };
        if let Some(&at) = seen_at.get(&previous) {
            let mut cycle = vec![nodes[previous].id().clone()];
            cycle.extend(path[at..].iter().rev().map(|&n| nodes[n].id().clone()));
            return Err(BuildError::CyclicDependency { cycle });
        }
        seen_at.insert(previous, path.len());
        path.push(previous);
        current = previous;
    }

    Err(BuildError::CyclicDependency {
        cycle: vec![nodes[start].id().clone()],
    })
}

impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for descriptor in self.topological_order() {
            let dependencies = self.dependencies_of(descriptor.id().as_str());
            if dependencies.is_empty() {
                writeln!(f, "{} ({})", descriptor.id(), descriptor.kind())?;
            } else {
                let names: Vec<&str> = dependencies.iter().map(|id| id.as_str()).collect();
                writeln!(
                    f,
                    "{} ({}) <- {}",
                    descriptor.id(),
                    descriptor.kind(),
                    names.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

//! Declarative resource graphs for Stratus.
//!
//! `stratus_graph` turns a set of declared resources into a dependency graph
//! and drives their creation through an external [`Provider`] in dependency
//! order, feeding each resource's outputs forward into the inputs of the
//! resources that reference them.
//!
//! # Core Concepts
//!
//! - [`ResourceDescriptor`] - Immutable declaration of one external resource
//! - [`Value`] - Input values, either literal or [`OutputRef`] placeholders
//! - [`Stack`] - Per-run declaration context owning descriptors and exports
//! - [`DependencyGraph`] - Validated DAG with a deterministic topological order
//! - [`Evaluator`] - Runtime engine that provisions resources in order
//! - [`ExportRegistry`] - Named values resolved once evaluation completes
//!
//! # Example
//!
//! ```ignore
//! use stratus_graph::prelude::*;
//!
//! let mut stack = Stack::new("dev");
//! let bucket = stack.declare(ResourceDescriptor::new("spill", "aws:s3/bucket:Bucket"))?;
//! stack.declare(
//!     ResourceDescriptor::new("policy", "aws:iam/rolePolicy:RolePolicy")
//!         .with_input("resource", Value::concat([bucket.output("arn"), "/*".into()])),
//! )?;
//! stack.export("spill_bucket", bucket.output("id"))?;
//!
//! let report = Evaluator::new().deploy(&stack, &provider).await?;
//! ```
//!
//! [`Provider`]: stratus_provider::Provider

/// Resource identifiers, descriptors and handles.
pub mod resource;

/// Input values and output references.
pub mod value;

/// Write-once storage of provider outputs.
pub mod outputs;

/// Dependency graph construction and ordering.
pub mod graph;

/// Declaration context for one provisioning run.
pub mod stack;

/// Graph evaluation engine.
pub mod executor;

/// Export registry and resolved export table.
pub mod exports;

/// Deployment driver combining build, evaluation and export resolution.
pub mod deploy;

/// Lifecycle hooks for evaluation.
pub mod hooks;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::deploy::{DeploymentReport, DeploymentStatus, DeploymentSummary, FailedResource};
    pub use crate::executor::{
        CancellationHandle, Evaluation, EvaluationError, Evaluator, ProvisionCause,
        ProvisioningError, ResourceState,
    };
    pub use crate::exports::{ExportError, ExportRegistry, ExportTable};
    pub use crate::graph::{BuildError, DependencyEdge, DependencyGraph, EdgeReason};
    pub use crate::hooks::{EvaluationEvent, HookRegistrationError, Hooks};
    pub use crate::outputs::{OutputsError, ResolvedOutputs};
    pub use crate::resource::{ResourceDescriptor, ResourceHandle, ResourceId};
    pub use crate::stack::Stack;
    pub use crate::value::{OutputRef, ResolveError, Value};
}

// Re-export key types at crate root for convenience
pub use deploy::DeploymentReport;
pub use executor::{Evaluation, EvaluationError, Evaluator, ProvisioningError, ResourceState};
pub use exports::{ExportError, ExportRegistry, ExportTable};
pub use graph::{BuildError, DependencyGraph};
pub use outputs::ResolvedOutputs;
pub use resource::{ResourceDescriptor, ResourceHandle, ResourceId};
pub use stack::Stack;
pub use value::{OutputRef, Value};

//! Events emitted during evaluation.

use core::time::Duration;

use crate::resource::ResourceId;

/// Unified event enum for all evaluation hooks.
///
/// All observers receive `&EvaluationEvent` and match on the variants they
/// care about.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Evaluation-Level Events
    // ─────────────────────────────────────────────────────────────────────────
    /// Fired before the first provider call.
    EvaluationStart {
        /// Number of resources in the graph.
        resource_count: usize,
    },

    /// Fired when every resource was materialized.
    EvaluationComplete {
        /// Number of resources materialized.
        materialized: usize,
        /// Total evaluation duration.
        duration: Duration,
    },

    /// Fired when evaluation halted because a resource failed.
    EvaluationFailure {
        /// The first resource that failed.
        resource: ResourceId,
        /// Rendered error.
        error: String,
    },

    /// Fired when evaluation halted because it was cancelled.
    EvaluationCancelled {
        /// Number of resources materialized before halting.
        materialized: usize,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Resource Events
    // ─────────────────────────────────────────────────────────────────────────
    /// Inputs were resolved and the provider call is about to start.
    ResourceStart {
        /// The resource being provisioned.
        resource: ResourceId,
        /// Its provider kind.
        kind: String,
    },

    /// The provider call succeeded and outputs were recorded.
    ResourceMaterialized {
        /// The materialized resource.
        resource: ResourceId,
        /// Its provider kind.
        kind: String,
        /// How long the provider call took.
        duration: Duration,
    },

    /// Input resolution or the provider call failed.
    ResourceFailed {
        /// The failed resource.
        resource: ResourceId,
        /// Its provider kind.
        kind: String,
        /// Rendered error.
        error: String,
    },
}

impl EvaluationEvent {
    /// Returns the resource the event is about, if any.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            EvaluationEvent::EvaluationFailure { resource, .. }
            | EvaluationEvent::ResourceStart { resource, .. }
            | EvaluationEvent::ResourceMaterialized { resource, .. }
            | EvaluationEvent::ResourceFailed { resource, .. } => Some(resource),
            EvaluationEvent::EvaluationStart { .. }
            | EvaluationEvent::EvaluationComplete { .. }
            | EvaluationEvent::EvaluationCancelled { .. } => None,
        }
    }
}

//! Lifecycle hooks for evaluation.
//!
//! Observers registered on [`Hooks`] receive every [`EvaluationEvent`] the
//! evaluator emits, in registration order. They see each resource move
//! through its states and are the extension point for progress reporting,
//! metrics or audit logs.
//!
//! # Example
//!
//! ```
//! use stratus_graph::hooks::{EvaluationEvent, Hooks};
//!
//! let mut hooks = Hooks::new();
//! hooks
//!     .register_observer("progress", |event: &EvaluationEvent| {
//!         if let EvaluationEvent::ResourceMaterialized { resource, .. } = event {
//!             tracing::info!(%resource, "created");
//!         }
//!     })
//!     .unwrap();
//! ```

pub mod api;
pub mod events;

pub use api::{HookRegistrationError, Hooks};
pub use events::EvaluationEvent;

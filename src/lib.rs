//! Declarative provisioning of external resources as a dependency graph.
//!

pub use stratus_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use stratus_internal::prelude::*;
}

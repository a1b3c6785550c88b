//! # Stratus Internal Library
//!
//! Re-exports the core Stratus crates for convenience.

/// Layer 1: Provider client interface and simulated cloud.
pub use stratus_provider;

/// Layer 1: Configuration input.
pub use stratus_config;

/// Layer 1: Logging setup.
pub use stratus_core;

/// Layer 2: Resource graph, evaluator and exports.
pub use stratus_graph;

/// Layer 3: Federated-query connector topology.
pub use stratus_connector;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use stratus_config::{Config, ConfigError};
    pub use stratus_connector::{ConnectorHandles, ConnectorSettings, declare_connector};
    pub use stratus_core::{TracingFormat, TracingSetup};
    pub use stratus_graph::prelude::*;
    pub use stratus_provider::{
        CreateRequest, Fields, Provider, ProviderError, ProviderRegistry, SimulatedCloud,
    };
}

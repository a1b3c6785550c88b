//! Provider client interface for Stratus.
//!
//! The evaluator in `stratus_graph` never talks to a cloud API directly. Every
//! resource is materialized through a [`Provider`], an opaque collaborator that
//! receives fully resolved inputs and returns the fields it assigned.
//!
//! # Core Concepts
//!
//! - [`Provider`] - Async trait implemented by provider integrations
//! - [`CreateRequest`] - A single resource creation call
//! - [`ProviderRegistry`] - Routes resource kinds to providers by package
//! - [`SimulatedCloud`] - In-memory provider for dry runs and tests

pub mod error;
pub mod provider;
pub mod registry;
pub mod simulated;

pub use error::ProviderError;
pub use provider::{CreateRequest, Fields, Provider};
pub use registry::ProviderRegistry;
pub use simulated::SimulatedCloud;

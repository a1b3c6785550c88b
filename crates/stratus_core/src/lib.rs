//! Core infrastructure shared by Stratus binaries.
//!
//! - [`TracingSetup`] - Installs the global `tracing` subscriber

pub mod tracing_setup;

pub use tracing_setup::{ParseFormatError, TracingConfig, TracingFormat, TracingSetup};

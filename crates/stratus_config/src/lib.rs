//! Layered stack configuration for Stratus.
//!
//! A [`Config`] is a flat map of string keys to string values. Values are
//! loaded in layers, each one overriding the keys it defines:
//!
//! 1. a JSON file ([`Config::load_json_file`])
//! 2. prefixed environment variables ([`Config::load_env`])
//! 3. explicit overrides ([`Config::set`])
//!
//! Typed access goes through [`Config::get_parsed`] and
//! [`Config::require_parsed`].

pub mod config;
pub mod error;

pub use config::{Config, ConfigSource, DEFAULT_ENV_PREFIX};
pub use error::ConfigError;

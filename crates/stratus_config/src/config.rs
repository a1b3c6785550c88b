//! The layered configuration map.

use core::fmt;
use core::str::FromStr;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::error::ConfigError;

/// Environment variable prefix read by [`Config::from_env`].
pub const DEFAULT_ENV_PREFIX: &str = "STRATUS_";

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A JSON configuration file.
    File(PathBuf),
    /// An environment variable.
    Environment(String),
    /// An explicit override.
    Override,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
            ConfigSource::Environment(var) => write!(f, "env {var}"),
            ConfigSource::Override => f.write_str("override"),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    source: ConfigSource,
}

/// Flat, layered string configuration.
///
/// # Example
///
/// ```
/// use stratus_config::Config;
///
/// let mut config = Config::new();
/// config.set("name", "analytics");
/// config.set("spill_bucket_retention_days", "14");
///
/// assert_eq!(config.require("name").unwrap(), "analytics");
/// assert_eq!(config.get_parsed::<u32>("spill_bucket_retention_days").unwrap(), Some(14));
/// assert!(config.require("sg_ids").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: IndexMap<String, Entry>,
}

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// See [`load_json_file`](Self::load_json_file).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.load_json_file(path)?;
        Ok(config)
    }

    /// Creates a configuration from `STRATUS_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(DEFAULT_ENV_PREFIX);
        config
    }

    /// Layers the top-level entries of a JSON object file.
    ///
    /// Strings are taken verbatim, numbers and booleans are stringified,
    /// arrays are joined with commas and `null` entries are skipped.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Io`] if the file cannot be read
    /// - [`ConfigError::Json`] if it is not a JSON object
    /// - [`ConfigError::Invalid`] for nested objects
    pub fn load_json_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let object: Map<String, JsonValue> =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut loaded = 0usize;
        for (key, value) in object {
            let Some(value) = stringify(&key, &value)? else {
                continue;
            };
            self.insert(key, value, ConfigSource::File(path.to_path_buf()));
            loaded += 1;
        }
        tracing::debug!(path = %path.display(), keys = loaded, "loaded configuration file");
        Ok(())
    }

    /// Layers environment variables starting with `prefix`.
    ///
    /// `STRATUS_SPILL_BUCKET_RETENTION_DAYS` becomes
    /// `spill_bucket_retention_days`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Layers `(name, value)` pairs as if they were environment variables.
    pub fn load_vars<I, K, V>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let name = name.as_ref();
            let Some(key) = name.strip_prefix(prefix) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let key = key.to_ascii_lowercase();
            tracing::trace!(var = name, key = %key, "configuration from environment");
            self.insert(key, value.into(), ConfigSource::Environment(name.to_string()));
        }
    }

    /// Sets a value, overriding every earlier layer.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key.into(), value.into(), ConfigSource::Override);
    }

    /// Parses a `key=value` override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if there is no `=` or the key is
    /// empty.
    pub fn set_pair(&mut self, pair: &str) -> Result<(), ConfigError> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                self.set(key.trim(), value);
                Ok(())
            }
            _ => Err(ConfigError::invalid(pair, pair, "expected key=value")),
        }
    }

    fn insert(&mut self, key: String, value: String, source: ConfigSource) {
        if let Some(previous) = self.entries.get(&key) {
            tracing::trace!(key = %key, from = %previous.source, to = %source, "configuration overridden");
        }
        self.entries.insert(key, Entry { value, source });
    }

    /// Returns a value, treating empty strings as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(|entry| entry.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Returns where a value came from.
    #[must_use]
    pub fn source(&self, key: &str) -> Option<&ConfigSource> {
        self.entries.get(key).map(|entry| &entry.source)
    }

    /// Returns true if the key has a non-empty value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns a required value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the key is absent or empty.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    /// Returns an optional value parsed with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the value does not parse.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| parse(key, raw))
            .transpose()
    }

    /// Returns a required value parsed with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] or [`ConfigError::Invalid`].
    pub fn require_parsed<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        parse(key, self.require(key)?)
    }

    /// Returns a comma-separated value as trimmed, non-empty items.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(split_list)
    }

    /// Returns a required comma-separated value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the key is absent, or has no
    /// non-empty items.
    pub fn require_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        let items = split_list(self.require(key)?);
        if items.is_empty() {
            return Err(ConfigError::Missing {
                key: key.to_string(),
            });
        }
        Ok(items)
    }

    /// Checks that every listed key has a value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first absent key.
    pub fn check_required<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Result<(), ConfigError> {
        keys.into_iter().try_for_each(|key| self.require(key).map(drop))
    }

    /// Returns every key and value in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.value.as_str()))
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| ConfigError::invalid(key, raw, err))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn stringify(key: &str, value: &JsonValue) -> Result<Option<String>, ConfigError> {
    Ok(Some(match value {
        JsonValue::Null => return Ok(None),
        JsonValue::String(text) => text.clone(),
        JsonValue::Bool(_) | JsonValue::Number(_) => value.to_string(),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(text) => Ok(text.clone()),
                JsonValue::Bool(_) | JsonValue::Number(_) => Ok(item.to_string()),
                _ => Err(ConfigError::invalid(key, value.to_string(), "arrays may only hold scalars")),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join(","),
        JsonValue::Object(_) => {
            return Err(ConfigError::invalid(
                key,
                value.to_string(),
                "nested objects are not supported",
            ));
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_earlier_ones() {
        let mut config = Config::new();
        config.load_vars("STRATUS_", [("STRATUS_NAME", "from-env")]);
        assert_eq!(config.get("name"), Some("from-env"));

        config.set("name", "override");
        assert_eq!(config.get("name"), Some("override"));
        assert_eq!(config.source("name"), Some(&ConfigSource::Override));
    }

    #[test]
    fn env_keys_are_stripped_and_lowercased() {
        let mut config = Config::new();
        config.load_vars(
            DEFAULT_ENV_PREFIX,
            [
                ("STRATUS_SPILL_BUCKET_RETENTION_DAYS", "3"),
                ("OTHER_NAME", "ignored"),
                ("STRATUS_", "ignored"),
            ],
        );

        assert_eq!(config.len(), 1);
        assert_eq!(config.get("spill_bucket_retention_days"), Some("3"));
        assert_eq!(
            config.source("spill_bucket_retention_days"),
            Some(&ConfigSource::Environment(
                "STRATUS_SPILL_BUCKET_RETENTION_DAYS".to_string()
            ))
        );
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut config = Config::new();
        config.set("name", "");

        assert!(!config.contains("name"));
        assert!(matches!(config.require("name"), Err(ConfigError::Missing { key }) if key == "name"));
    }

    #[test]
    fn parsed_values() {
        let mut config = Config::new();
        config.set("days", " 14 ");
        config.set("bad", "soon");

        assert_eq!(config.get_parsed::<u32>("days").unwrap(), Some(14));
        assert_eq!(config.get_parsed::<u32>("absent").unwrap(), None);
        assert!(matches!(
            config.get_parsed::<u32>("bad"),
            Err(ConfigError::Invalid { key, value, .. }) if key == "bad" && value == "soon"
        ));
        assert!(matches!(
            config.require_parsed::<u32>("absent"),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn lists_are_split_and_trimmed() {
        let mut config = Config::new();
        config.set("subnet_ids", "subnet-a, subnet-b,,");
        config.set("sg_ids", " , ");

        assert_eq!(
            config.get_list("subnet_ids"),
            Some(vec!["subnet-a".to_string(), "subnet-b".to_string()])
        );
        assert!(matches!(config.require_list("sg_ids"), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn check_required_reports_first_missing_key() {
        let mut config = Config::new();
        config.set("name", "x");

        assert!(config.check_required(["name"]).is_ok());
        let err = config.check_required(["name", "subnet_ids", "sg_ids"]).unwrap_err();
        assert_eq!(err.to_string(), "missing required configuration value 'subnet_ids'");
    }

    #[test]
    fn set_pair_parses_overrides() {
        let mut config = Config::new();
        config.set_pair("name=analytics").unwrap();
        config.set_pair("conn=a=b").unwrap();

        assert_eq!(config.get("name"), Some("analytics"));
        assert_eq!(config.get("conn"), Some("a=b"));
        assert!(config.set_pair("no-equals").is_err());
        assert!(config.set_pair("=value").is_err());
    }

    #[test]
    fn json_scalars_and_arrays_are_stringified() {
        assert_eq!(stringify("k", &serde_json::json!(7)).unwrap(), Some("7".to_string()));
        assert_eq!(stringify("k", &serde_json::json!(true)).unwrap(), Some("true".to_string()));
        assert_eq!(
            stringify("k", &serde_json::json!(["a", 1])).unwrap(),
            Some("a,1".to_string())
        );
        assert_eq!(stringify("k", &JsonValue::Null).unwrap(), None);
        assert!(stringify("k", &serde_json::json!({ "a": 1 })).is_err());
        assert!(stringify("k", &serde_json::json!([[1]])).is_err());
    }
}

//! Connector parameters.

use stratus_config::{Config, ConfigError};

/// Configuration keys that must be present before anything is declared.
pub const REQUIRED_KEYS: [&str; 4] = ["name", "subnet_ids", "sg_ids", "default_redshift_connection"];

/// Configuration keys with defaults.
pub const OPTIONAL_KEYS: [&str; 3] = ["spill_bucket_retention_days", "region", "register_catalog"];

/// Days before spilled query results expire.
pub const DEFAULT_SPILL_RETENTION_DAYS: u32 = 7;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Parameters of one connector deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSettings {
    /// Prefix for every resource name.
    pub name: String,
    /// VPC subnets the connector Lambda runs in.
    pub subnet_ids: Vec<String>,
    /// Security groups attached to the connector Lambda.
    pub security_group_ids: Vec<String>,
    /// Lifetime of spilled objects.
    pub spill_retention_days: u32,
    /// Connection string the connector uses when a query names no catalog.
    pub default_connection: String,
    /// Region of the Lambda function referenced by the catalog.
    pub region: String,
    /// Whether to register an Athena data catalog for the connector.
    pub register_catalog: bool,
}

impl ConnectorSettings {
    /// Creates settings with default retention, region and catalog
    /// registration, and no network placement.
    #[must_use]
    pub fn new(name: impl Into<String>, default_connection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
            spill_retention_days: DEFAULT_SPILL_RETENTION_DAYS,
            default_connection: default_connection.into(),
            region: DEFAULT_REGION.to_string(),
            register_catalog: true,
        }
    }

    /// Reads settings from configuration.
    ///
    /// Every key in [`REQUIRED_KEYS`] is checked before any value is parsed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first absent required key,
    /// or [`ConfigError::Invalid`] if a value does not parse.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.check_required(REQUIRED_KEYS)?;

        let retention = config
            .get_parsed::<u32>("spill_bucket_retention_days")?
            .unwrap_or(DEFAULT_SPILL_RETENTION_DAYS);
        if retention == 0 {
            return Err(ConfigError::invalid(
                "spill_bucket_retention_days",
                "0",
                "must be at least one day",
            ));
        }

        let settings = Self {
            name: config.require("name")?.to_string(),
            subnet_ids: config.require_list("subnet_ids")?,
            security_group_ids: config.require_list("sg_ids")?,
            spill_retention_days: retention,
            default_connection: config.require("default_redshift_connection")?.to_string(),
            region: config.get("region").unwrap_or(DEFAULT_REGION).to_string(),
            register_catalog: config.get_parsed("register_catalog")?.unwrap_or(true),
        };
        tracing::debug!(
            name = %settings.name,
            region = %settings.region,
            retention_days = settings.spill_retention_days,
            register_catalog = settings.register_catalog,
            defaulted = ?Self::defaulted_keys(config),
            "connector settings loaded"
        );
        Ok(settings)
    }

    /// Returns the [`OPTIONAL_KEYS`] absent from `config`, whose defaults
    /// [`from_config`](Self::from_config) applies.
    #[must_use]
    pub fn defaulted_keys(config: &Config) -> Vec<&'static str> {
        OPTIONAL_KEYS
            .into_iter()
            .filter(|key| config.get(key).is_none())
            .collect()
    }

    /// Sets the VPC subnets.
    #[must_use]
    pub fn with_subnet_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subnet_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the security groups.
    #[must_use]
    pub fn with_security_group_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_group_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the spill retention in days.
    #[must_use]
    pub fn with_spill_retention_days(mut self, days: u32) -> Self {
        self.spill_retention_days = days;
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Enables or disables catalog registration.
    #[must_use]
    pub fn with_catalog(mut self, enabled: bool) -> Self {
        self.register_catalog = enabled;
        self
    }

    /// Name of the connector Lambda function.
    #[must_use]
    pub fn lambda_name(&self) -> String {
        format!("{}-lambda", self.name)
    }

    /// Name of the Athena data catalog.
    #[must_use]
    pub fn catalog_name(&self) -> String {
        format!("{}_catalog", self.name)
    }
}

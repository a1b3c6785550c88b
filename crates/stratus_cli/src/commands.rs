//! `plan` and `deploy` subcommands.

use std::io::Write;
use std::sync::Arc;

use stratus_config::{Config, ConfigError};
use stratus_connector::topology::CALLER_IDENTITY_KIND;
use stratus_connector::{ConnectorSettings, declare_connector};
use stratus_graph::{BuildError, Evaluator, Stack};
use stratus_provider::{ProviderRegistry, SimulatedCloud};

/// Errors surfaced to the user.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The declared topology is invalid.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Writing output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the summary failed.
    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options of the `deploy` subcommand.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub stack: String,
    pub concurrency: usize,
    pub fail_on: Vec<String>,
    pub account_id: String,
    pub json: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            stack: "dev".to_string(),
            concurrency: 1,
            fail_on: Vec::new(),
            account_id: "123456789012".to_string(),
            json: false,
        }
    }
}

fn declare(config: &Config, stack_name: &str) -> Result<Stack, CliError> {
    let settings = ConnectorSettings::from_config(config)?;
    let mut stack = Stack::new(stack_name);
    declare_connector(&mut stack, &settings)?;
    Ok(stack)
}

/// Writes the provisioning order and the declared exports.
pub fn plan(config: &Config, out: &mut impl Write) -> Result<(), CliError> {
    let stack = declare(config, "plan")?;
    let graph = stack.build()?;

    writeln!(out, "{} resources, {} edges", graph.len(), graph.edge_count())?;
    write!(out, "{graph}")?;
    writeln!(out, "exports:")?;
    for (name, value) in stack.exports().iter() {
        let refs: Vec<String> = value.references().map(ToString::to_string).collect();
        if refs.is_empty() {
            writeln!(out, "  {name}")?;
        } else {
            writeln!(out, "  {name} <- {}", refs.join(", "))?;
        }
    }
    Ok(())
}

/// Deploys against the simulated cloud and writes the summary.
///
/// Every `aws:*` kind is routed to one [`SimulatedCloud`].
///
/// Returns whether every resource was materialized.
pub async fn deploy(
    config: &Config,
    options: &DeployOptions,
    out: &mut impl Write,
) -> Result<bool, CliError> {
    let stack = declare(config, &options.stack)?;

    let cloud = options.fail_on.iter().fold(
        SimulatedCloud::new().with_static_output(
            CALLER_IDENTITY_KIND,
            "accountId",
            options.account_id.as_str(),
        ),
        |cloud, id| cloud.fail_on(id.as_str(), "rejected by --fail-on"),
    );
    let mut providers = ProviderRegistry::new();
    providers.register("aws", Arc::new(cloud));

    let evaluator = Evaluator::new().with_max_concurrency(options.concurrency);
    let handle = evaluator.cancellation_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, waiting for in-flight provider calls");
            handle.cancel();
        }
    });

    let report = evaluator.deploy(&stack, &providers).await;
    interrupt.abort();
    let report = report?;

    let summary = report.summary();
    if options.json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    } else {
        write!(out, "{summary}")?;
    }

    Ok(report.is_success())
}

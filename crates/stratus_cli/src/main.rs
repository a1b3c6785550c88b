//! Stratus CLI.
//!
//! Plans or deploys the federated-query connector topology against the
//! simulated cloud.
//!
//! # Usage
//!
//! ```bash
//! stratus [--config <FILE>] [--set key=value]... <plan|deploy> [OPTIONS]
//! ```
//!
//! Configuration is layered: the JSON file, then `STRATUS_*` environment
//! variables (a `.env` file is loaded first), then `--set` overrides.
//!
//! # Example
//!
//! ```bash
//! STRATUS_NAME=analytics stratus --config connector.json deploy --concurrency 4
//! ```

mod commands;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stratus_config::{Config, DEFAULT_ENV_PREFIX};
use stratus_core::{TracingFormat, TracingSetup};
use tracing::Level;

use crate::commands::{CliError, DeployOptions};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Declarative provisioning of the federated-query connector")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "STRATUS_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration override, `key=value` (repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value = "compact")]
    log_format: TracingFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resources in provisioning order, and the exports
    Plan,

    /// Provision every resource against the simulated cloud
    Deploy {
        /// Stack name used in reports
        #[arg(long, default_value = "dev")]
        stack: String,

        /// Maximum number of concurrent provider calls
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Make the simulated cloud reject this resource id (repeatable)
        #[arg(long, value_name = "RESOURCE")]
        fail_on: Vec<String>,

        /// Account id returned by the caller-identity lookup
        #[arg(long, default_value = "123456789012")]
        account_id: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::new(),
    };
    config.load_env(DEFAULT_ENV_PREFIX);
    for pair in &cli.overrides {
        config.set_pair(pair)?;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<bool, CliError> {
    let config = load_config(&cli)?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Plan => {
            commands::plan(&config, &mut stdout)?;
            Ok(true)
        }
        Command::Deploy {
            stack,
            concurrency,
            fail_on,
            account_id,
            json,
        } => {
            let options = DeployOptions {
                stack,
                concurrency,
                fail_on,
                account_id,
                json,
            };
            commands::deploy(&config, &options, &mut stdout).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    TracingSetup::new()
        .with_level(cli.log_level)
        .with_format(cli.log_format)
        .install();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            let _ = writeln!(io::stderr(), "error: {err}");
            ExitCode::FAILURE
        }
    }
}

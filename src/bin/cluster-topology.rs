// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Topology CLI
//!
//! Declares the k3s cluster topology and realizes it against the in-memory
//! reference engine, persisting realized state between runs.
//!
//! Run with: cargo run --bin cluster-topology -- [plan|apply|destroy|outputs]
//!
//! Environment:
//! 1. PUBLIC_KEY: SSH public key for the cluster key pair. Required by
//!    `plan`, `apply` and `outputs`; `destroy` tears down whatever the state
//!    file holds and needs no key material.
//! 2. CLUSTER_AVAILABILITY_ZONE, CLUSTER_INSTANCE_TYPE, CLUSTER_AMI,
//!    CLUSTER_WORKER_COUNT, CLUSTER_KEY_NAME: optional overrides
//! 3. CLUSTER_STATE_FILE: realized state (default: .cluster-state.json)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cim_cluster_topology::{
    declare_cluster, ClusterConfig, InMemoryEngine, ProvisioningEngine, Stack,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "cluster-topology")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declare and realize the k3s cluster network topology", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// File holding realized state between runs
    #[arg(long, global = true, env = "CLUSTER_STATE_FILE", default_value = ".cluster-state.json")]
    state_file: PathBuf,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Print the resolved plan as JSON (default)
    Plan,

    /// Realize the plan and print the stack outputs
    #[command(alias = "up")]
    Apply,

    /// Tear down every realized resource, newest first
    #[command(alias = "down")]
    Destroy,

    /// Print outputs from previously realized state
    Outputs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let state_file = cli.state_file;

    match cli.command.unwrap_or(Commands::Plan) {
        Commands::Plan => {
            let stack = load_stack(&state_file)?;
            println!("{}", serde_json::to_string_pretty(stack.plan())?);
        }
        Commands::Apply => {
            let stack = load_stack(&state_file)?;
            let mut engine = load_engine(&state_file).await?;
            info!("🚀 Applying plan");
            let outputs = stack
                .up(&mut engine)
                .await
                .context("Failed to apply plan")?;
            engine
                .save(&state_file)
                .await
                .context("Failed to save state")?;
            info!("✅ Applied {} resources", engine.state().len());
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        Commands::Destroy => {
            let mut engine = load_engine(&state_file).await?;
            info!("🧹 Destroying realized resources");
            let plan = engine.state().realized_plan();
            let deleted = engine
                .destroy(&plan)
                .await
                .context("Failed to destroy realized resources")?;
            engine
                .save(&state_file)
                .await
                .context("Failed to save state")?;
            info!("✅ Destroyed {} resources", deleted.len());
        }
        Commands::Outputs => {
            let stack = load_stack(&state_file)?;
            let engine = load_engine(&state_file).await?;
            println!("{}", serde_json::to_string_pretty(&realized_outputs(&stack, &engine))?);
        }
    }

    Ok(())
}

fn load_stack(state_file: &Path) -> Result<Stack> {
    let config = ClusterConfig::from_env().context("Invalid cluster configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - Availability zone: {}", config.availability_zone);
    info!("  - Instance type: {}", config.instance_type);
    info!("  - Workers: {}", config.worker_count);
    info!("  - State file: {}", state_file.display());

    let stack = declare_cluster(&config)
        .context("Failed to declare cluster topology. Is PUBLIC_KEY set?")?;
    info!("✅ Resolved {} resources", stack.plan().len());
    Ok(stack)
}

async fn load_engine(state_file: &Path) -> Result<InMemoryEngine> {
    let engine = InMemoryEngine::load(state_file)
        .await
        .with_context(|| format!("Failed to load state from {}", state_file.display()))?;
    info!("📦 Loaded {} realized resources", engine.state().len());
    Ok(engine)
}

/// Export values from previously realized state, `null` where not realized
fn realized_outputs(stack: &Stack, engine: &InMemoryEngine) -> BTreeMap<String, Option<String>> {
    stack
        .exports()
        .map(|export| {
            let value = engine
                .realized(export.source.resource.as_str())
                .and_then(|resource| resource.attribute(&export.source.attribute))
                .map(str::to_string);
            (export.name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aliases_and_state_file_flag() {
        let cli = Cli::try_parse_from(["cluster-topology", "up"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Apply));

        let cli =
            Cli::try_parse_from(["cluster-topology", "down", "--state-file", "state.json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Destroy));
        assert_eq!(cli.state_file, PathBuf::from("state.json"));

        let cli = Cli::try_parse_from(["cluster-topology"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["cluster-topology", "teardown"]).is_err());
    }
}

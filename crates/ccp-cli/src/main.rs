// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ccpctl: thin operator CLI for local/dev use.
//!
//! Talks to the repository/registry in-process rather than over the
//! network — the real operator surface is the HTTP boundary exposed by
//! `ccpd`, which is out of scope here (§1).

#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use ccp_config::{validator, ConfigLoader};
use ccp_core::process::AgentCredentials;
use ccp_core::{FakeClock, RecordingSink};
use ccp_discovery::{InMemoryTaskStore, Scheduler, SchedulerConfig};
use ccp_registry::{Registry, RegistryConfig};
use ccp_transport::HttpTransport;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ccpctl", version, about = "Operator CLI for the control plane")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a configuration file without starting the daemon
    Config(ConfigArgs),
    /// Start a CIDR-range discovery scan
    Discovery(DiscoveryArgs),
    /// List known agents
    Agents(AgentsArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Load and validate the config at `path`
    Validate {
        path: String,
    },
}

#[derive(Args)]
struct DiscoveryArgs {
    #[command(subcommand)]
    command: DiscoveryCommand,
}

#[derive(Subcommand)]
enum DiscoveryCommand {
    /// Scan `cidr` on `port` for running agents
    Start {
        cidr: String,
        #[arg(long)]
        port: u16,
        #[arg(long, default_value = "admin")]
        username: String,
        #[arg(long, default_value = "")]
        password: String,
    },
}

#[derive(Args)]
struct AgentsArgs {
    #[command(subcommand)]
    command: AgentsCommand,
}

#[derive(Subcommand)]
enum AgentsCommand {
    /// List agents currently known to an in-process registry
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Config(args) => run_config(args).await,
        Command::Discovery(args) => run_discovery(args).await,
        Command::Agents(args) => run_agents(args).await,
    }
}

async fn run_config(args: ConfigArgs) -> Result<()> {
    let ConfigCommand::Validate { path } = args.command;
    let loader = ConfigLoader::new(path.clone());
    match loader.load() {
        Ok(snapshot) => {
            validator::run_chain(&validator::default_chain(), &snapshot)
                .map_err(|err| anyhow::anyhow!("{path}: {err}"))?;
            println!("{path}: ok");
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!("{path}: {err}")),
    }
}

async fn run_discovery(args: DiscoveryArgs) -> Result<()> {
    let DiscoveryCommand::Start { cidr, port, username, password } = args.command;

    let transport = Arc::new(HttpTransport::new()?);
    let sink = Arc::new(RecordingSink::new());
    let registry = Arc::new(Registry::new(
        transport.clone(),
        sink.clone(),
        Arc::new(FakeClock::new()),
        RegistryConfig::default(),
    ));
    let scheduler = Scheduler::new(
        transport,
        registry,
        sink,
        Arc::new(InMemoryTaskStore::new()),
        SchedulerConfig::default(),
    );

    let task_id =
        scheduler.start_scan(&cidr, port, AgentCredentials { username, password }, "ccpctl").await?;
    println!("scan started: {task_id}");
    Ok(())
}

async fn run_agents(args: AgentsArgs) -> Result<()> {
    let AgentsCommand::List = args.command;
    // A fresh in-process registry with nothing registered — demonstrates
    // the call shape operators would use against a live daemon's registry,
    // since the network client itself is out of scope (§1).
    let transport = Arc::new(HttpTransport::new()?);
    let sink = Arc::new(RecordingSink::new());
    let registry = Registry::new(transport, sink, Arc::new(FakeClock::new()), RegistryConfig::default());
    for summary in registry.list().await {
        println!("{} {}:{} connected={}", summary.name, summary.host, summary.port, summary.connected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn valid_config_file_validates_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nlisten_addr = \"0.0.0.0:8080\"\n").unwrap();
        let args = ConfigArgs { command: ConfigCommand::Validate { path: path.to_string_lossy().into_owned() } };
        assert!(run_config(args).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_listen_addr_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nlisten_addr = \"not-an-address\"\n").unwrap();
        let args = ConfigArgs { command: ConfigCommand::Validate { path: path.to_string_lossy().into_owned() } };
        assert!(run_config(args).await.is_err());
    }
}

//! # CLI Interface
//!
//! Defines the command-line argument structure for `vesta-node` using
//! `clap` derive. Supports three subcommands: `run`, `demo`, and
//! `version`.

use clap::{Parser, Subcommand};

/// VESTA custody ledger node.
///
/// A standalone custody service for time-locked value. Hosts the vault
/// registry, serves the REST/WebSocket API, and exposes Prometheus
/// metrics.
#[derive(Parser, Debug)]
#[command(
    name = "vesta-node",
    about = "VESTA custody ledger node",
    version,
    propagate_version = true
)]
pub struct VestaNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VESTA node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the custody node.
    Run(RunArgs),
    /// Walk a scripted vault lifecycle on a manual clock and print every
    /// step. Useful for demos and smoke checks; touches no real state.
    Demo,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the REST and WebSocket API.
    #[arg(long, env = "VESTA_API_PORT", default_value_t = vesta_ledger::config::DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VESTA_METRICS_PORT", default_value_t = vesta_ledger::config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Account that owns the registry and may administer the authorized set.
    #[arg(long, env = "VESTA_CUSTODIAN", default_value = "vesta:custodian")]
    pub custodian: String,

    /// Deployment identifier reported by `/status` (e.g., "devnet", "prod").
    #[arg(long, env = "VESTA_NETWORK", default_value = "devnet")]
    pub network: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VESTA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

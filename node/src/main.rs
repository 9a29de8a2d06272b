// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VESTA Custody Node
//!
//! Entry point for the `vesta-node` binary. Parses CLI arguments, initializes
//! logging and metrics, wires the custody ledger to its runtime collaborators,
//! and serves the HTTP/WS API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     -- start the custody node and serve the API
//! - `demo`    -- walk a scripted vault lifecycle against an in-process ledger
//! - `version` -- print build version information

mod api;
mod cli;
mod events;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use vesta_ledger::account::AccountId;
use vesta_ledger::clock::{Clock, ManualClock, SystemClock};
use vesta_ledger::config;
use vesta_ledger::notify::{BufferedSink, VaultEvent};
use vesta_ledger::treasury::Treasury;
use vesta_ledger::vault::VaultRegistry;

use cli::{Commands, VestaNodeCli};
use events::EventBridge;
use logging::LogFormat;
use metrics::NodeMetrics;

/// Broadcast channel capacity for live event streaming.
/// 256 is large enough to absorb short bursts without dropping events
/// for connected WebSocket clients.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How often the node mirrors ledger aggregates into Prometheus gauges.
/// Counters update inline as events flow through the bridge; the gauges
/// track registry totals on this cadence instead.
const GAUGE_SYNC_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VestaNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Demo => run_demo(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full custody node: API server, metrics endpoint, and the
/// gauge sync loop.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "vesta_node=info,vesta_ledger=info,tower_http=warn",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        custodian = %args.custodian,
        network = %args.network,
        "starting vesta-node"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel::<VaultEvent>(EVENT_CHANNEL_CAPACITY);

    // --- Ledger ---
    // The event bridge doubles as the registry's notification sink and the
    // API's broadcast source, so every ledger event reaches both the
    // Prometheus counters and any connected WebSocket clients.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let treasury = Arc::new(Treasury::new());
    let bridge = Arc::new(EventBridge::new(event_tx.clone(), Arc::clone(&node_metrics)));
    let registry = Arc::new(VaultRegistry::new(
        AccountId::new(args.custodian.as_str()),
        clock,
        treasury.clone(),
        bridge,
    ));
    tracing::info!(custodian = %args.custodian, "vault registry initialized");

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (ledger {})",
            env!("CARGO_PKG_VERSION"),
            config::LEDGER_VERSION,
        ),
        network: args.network.clone(),
        started_at: chrono::Utc::now(),
        registry: Arc::clone(&registry),
        treasury,
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Gauge sync loop ---
    let registry_ref = Arc::clone(&registry);
    let metrics_ref = Arc::clone(&node_metrics);
    let gauge_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            GAUGE_SYNC_INTERVAL_SECS,
        ));
        loop {
            interval.tick().await;
            let stats = registry_ref.stats();
            metrics_ref.active_vaults.set(registry_ref.active_vaults() as i64);
            metrics_ref.embers_locked.set(stats.total_locked as i64);

            tracing::debug!(
                vaults = stats.total_vaults,
                locked = stats.total_locked,
                "ledger gauges synced"
            );
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    gauge_loop.abort();
    tracing::info!("vesta-node stopped");
    Ok(())
}

/// Walks a complete custody lifecycle against an in-process ledger on a
/// manual clock, printing each step. Doubles as a smoke test and a guided
/// tour of the vault rules.
fn run_demo() -> Result<()> {
    let clock = Arc::new(ManualClock::starting_now());
    let treasury = Arc::new(Treasury::new());
    let sink = Arc::new(BufferedSink::new());

    let registry = VaultRegistry::new(
        AccountId::new("vesta:custodian"),
        clock.clone(),
        treasury.clone(),
        sink.clone(),
    );

    println!("VESTA custody ledger demo ({})", config::LEDGER_FINGERPRINT);
    println!("Unit of account: {}", config::UNIT_NAME);
    println!();

    let alice = AccountId::new("vesta:alice");
    let bob = AccountId::new("vesta:bob");
    let carol = AccountId::new("vesta:carol");

    treasury.credit_external(&alice, 10_000)?;
    treasury.credit_external(&carol, 3_000)?;
    println!("Funded {} with 10000 and {} with 3000 {}.", alice, carol, config::UNIT_NAME);

    // Alice locks savings for 30 days with Bob as beneficiary.
    let info = registry.create_vault(&alice, "college fund", 30, Some(bob.clone()), 5_000)?;
    println!();
    println!("{} opened vault \"{}\":", alice, info.name);
    println!("  balance     : {} {}", info.balance, config::UNIT_NAME);
    println!("  unlocks     : {} ({} days)", info.unlock_time, info.days_left);
    println!("  beneficiary : {}", info.beneficiary);

    let balance = registry.deposit(&alice, 1_500)?;
    println!("{} deposited 1500, vault balance now {}.", alice, balance);

    // Early withdrawal is refused while the lock holds.
    match registry.withdraw(&alice, 1_000) {
        Err(err) => println!("Early withdrawal refused: {}", err),
        Ok(_) => println!("Unexpected: early withdrawal succeeded."),
    }

    // Carol bails out ahead of schedule and pays the penalty.
    registry.create_vault(&carol, "boat", 90, None, 3_000)?;
    let receipt = registry.emergency_withdraw(&carol)?;
    println!();
    println!("{} released the vault early:", carol);
    println!("  payout      : {} {}", receipt.payout, config::UNIT_NAME);
    println!("  penalty kept: {} {}", receipt.penalty, config::UNIT_NAME);

    // Thirty days on, the lock expires and Alice withdraws part.
    clock.advance_days(30);
    let receipt = registry.withdraw(&alice, 2_000)?;
    println!();
    println!(
        "After 30 days {} withdrew 2000, {} left in the vault.",
        alice, receipt.remaining_balance
    );

    // Alice goes quiet; once the grace period lapses Bob claims the rest.
    clock.advance_days(config::BENEFICIARY_GRACE_DAYS);
    clock.advance_secs(1);
    let claimed = registry.claim_as_beneficiary(&bob, &alice)?;
    println!(
        "Grace period over: {} claimed the remaining {} {}.",
        bob, claimed, config::UNIT_NAME
    );

    let stats = registry.stats();
    println!();
    println!("Final ledger state:");
    println!("  vaults opened : {}", stats.total_vaults);
    println!("  embers locked : {}", stats.total_locked);
    println!("  custody pool  : {}", treasury.pool_balance());
    println!("  {} holds : {}", alice, treasury.external_balance(&alice));
    println!("  {} holds   : {}", bob, treasury.external_balance(&bob));
    println!("  {} holds : {}", carol, treasury.external_balance(&carol));

    println!();
    println!("Event log:");
    for event in sink.drain() {
        println!("  {:<20} {}", event.label(), summarize_event(&event));
    }

    Ok(())
}

/// One-line rendering of an event for the demo transcript.
fn summarize_event(event: &VaultEvent) -> String {
    match event {
        VaultEvent::VaultOpened { account, name, amount, .. } => {
            format!("{} locked {} in \"{}\"", account, amount, name)
        }
        VaultEvent::BeneficiaryAssigned { account, beneficiary } => {
            format!("{} named {}", account, beneficiary)
        }
        VaultEvent::FundsDeposited { account, amount, balance } => {
            format!("{} added {}, balance {}", account, amount, balance)
        }
        VaultEvent::FundsWithdrawn { recipient, amount, remaining } => {
            format!("{} took {}, {} left", recipient, amount, remaining)
        }
        VaultEvent::EmergencyReleased { account, payout, penalty } => {
            format!("{} paid out {}, penalty {}", account, payout, penalty)
        }
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("vesta-node  {}", env!("CARGO_PKG_VERSION"));
    println!("ledger      {}", config::LEDGER_VERSION);
    println!("fingerprint {}", config::LEDGER_FINGERPRINT);
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

//! CNG-Protect bridge: entry point.
//!
//! Hexagonal architecture on a single cooperative executor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  feed thread (SSE)   JsonRpcLedger   ArchiveBackend            │
//! │  (SnapshotSource)    (LedgerPort)    (ArchivePort)             │
//! │  LogEventSink        JsonConfigFile                            │
//! │  (EventSink)         (ConfigPort)                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             BridgeService (pure logic)                 │    │
//! │  │  DangerTracker · UploadGate · Reporter · Publisher     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Heartbeat (metrics dump)                                      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use edge_executor::LocalExecutor;
use log::{info, warn};

use cngprotect::adapters::archive::ArchiveBackend;
use cngprotect::adapters::config_file::JsonConfigFile;
use cngprotect::adapters::ledger::JsonRpcLedger;
use cngprotect::adapters::log_sink::LogEventSink;
use cngprotect::app::ports::{ConfigError, ConfigPort};
use cngprotect::app::publisher::TelemetryPublisher;
use cngprotect::app::reporter::IncidentReporter;
use cngprotect::app::service::BridgeService;
use cngprotect::config::{BridgeConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use cngprotect::diagnostics::BridgeMetrics;
use cngprotect::events::FEED;
use cngprotect::stream::spawn_feed_thread;

/// Run-queue depth: control loop, heartbeat, one publisher and any
/// reporters still awaiting confirmation.
const EXECUTOR_TASKS: usize = 64;

fn load_config() -> Result<BridgeConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let port = JsonConfigFile::new(&path);
    let mut config = match port.load() {
        Ok(c) => c,
        Err(ConfigError::NotFound) => {
            warn!("Config: {} not found, using defaults", path);
            BridgeConfig::default()
        }
        Err(e) => return Err(e).with_context(|| format!("loading {path}")),
    };
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;
    let contract = config.contract()?;
    let ledger = JsonRpcLedger::new(&config.ledger, contract).context("ledger client")?;
    let sender = ledger.sender();

    info!("╔══════════════════════════════════════════════════════╗");
    info!("║  CNG-Protect bridge v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "║  Wallet:   {} ({})",
        sender,
        if config.ledger.wallet_key.is_some() { "local signer" } else { "node signer" }
    );
    info!("║  Contract: {}", contract);
    info!("║  Device:   {} ({})", config.device_id, config.feed.device_path);
    info!("╚══════════════════════════════════════════════════════╝");

    // ── 3. Adapters ───────────────────────────────────────────
    let archive = ArchiveBackend::from_config(&config.archive).context("archive client")?;
    let metrics = Rc::new(BridgeMetrics::new());
    let sink = Rc::new(LogEventSink::new());

    let service = Rc::new(BridgeService::new(
        &config.device_id,
        IncidentReporter::new(ledger, sender),
        TelemetryPublisher::new(archive, &config.archive.artifact_path),
        sink,
        metrics,
    ));

    // ── 4. Feed thread ────────────────────────────────────────
    let _feed = spawn_feed_thread(config.feed.clone(), &FEED).context("spawning feed thread")?;

    // ── 5. Executor ───────────────────────────────────────────
    // Spawned tasks outlive every stack frame here, so the executor lives
    // for the rest of the process.
    let executor: &'static LocalExecutor<'static, EXECUTOR_TASKS> =
        Box::leak(Box::new(LocalExecutor::new()));

    let heartbeat = Rc::clone(&service);
    let interval = Duration::from_secs(u64::from(config.runtime.stats_interval_secs));
    executor
        .spawn(async move { heartbeat.heartbeat(interval).await })
        .detach();

    futures_lite::future::block_on(executor.run(async { service.run(&FEED, executor).await }));

    let m = service.metrics().snapshot();
    info!(
        "Feed closed; exiting ({} incidents confirmed, {} uploads archived)",
        m.incidents_confirmed, m.uploads_archived
    );
    Ok(())
}

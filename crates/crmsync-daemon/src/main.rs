//! CRMSync Daemon - Background account synchronization service
//!
//! This binary runs as a long-lived service and handles:
//! - Periodic sync cycles against the Salesforce org
//! - Write-back of newly assigned remote IDs to the local store
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the SQLite store and the Salesforce gateway into a
//! `SyncAccountsUseCase`, then enters a loop that runs one cycle per interval
//! tick. The loop is controlled by a `CancellationToken` that is triggered on
//! receipt of SIGTERM or SIGINT; a cycle in progress always runs to completion.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crmsync_cache::{DatabasePool, SqliteAccountRepository};
use crmsync_core::{
    config::{Config, LoggingConfig},
    ports::{EmailRecordValidator, IAccountRepository, ICrmGateway, IRecordValidator},
    usecases::SyncAccountsUseCase,
};
use crmsync_salesforce::provider::SalesforceGateway;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming an explicit configuration file
const CONFIG_ENV: &str = "CRMSYNC_CONFIG";

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service that owns the wired use case
struct DaemonService {
    /// Validated configuration
    config: Config,
    /// Database pool, closed on shutdown
    db_pool: DatabasePool,
    /// Sync orchestrator over the store and the gateway
    use_case: SyncAccountsUseCase,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens the database and builds the Salesforce gateway
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::open(&config.database)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    config.database.path.display()
                )
            })?;
        info!(path = %config.database.path.display(), "Opened account store");

        let repository = Arc::new(SqliteAccountRepository::new(db_pool.pool().clone()));
        let gateway = Arc::new(
            SalesforceGateway::new(&config.salesforce)
                .context("Failed to build Salesforce gateway")?,
        );

        let use_case = SyncAccountsUseCase::new(
            gateway as Arc<dyn ICrmGateway + Send + Sync>,
            repository as Arc<dyn IAccountRepository + Send + Sync>,
            Arc::new(EmailRecordValidator) as Arc<dyn IRecordValidator + Send + Sync>,
        );

        Ok(Self {
            config,
            db_pool,
            use_case,
            shutdown,
        })
    }

    /// Runs the sync loop until shutdown, then closes the store
    async fn run(&self) -> Result<()> {
        let cycles = sync_loop(
            &self.use_case,
            self.config.sync.interval_secs,
            self.config.sync.lookback(),
            &self.shutdown,
        )
        .await;

        info!(cycles, "Sync loop terminated");
        self.db_pool.close().await;
        Ok(())
    }
}

// ============================================================================
// Periodic sync
// ============================================================================

/// Runs one cycle per interval tick until `shutdown` is cancelled
///
/// The first tick fires immediately. Cycles never overlap: a slow cycle
/// delays the next tick instead of queueing a burst. Cycle failures are
/// logged and do not stop the loop. Returns the number of cycles run.
async fn sync_loop(
    use_case: &SyncAccountsUseCase,
    interval_secs: u64,
    lookback_secs: u64,
    shutdown: &CancellationToken,
) -> u64 {
    info!(interval_secs, lookback_secs, "Starting sync loop");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    let mut cycles = 0u64;
    loop {
        let since = cycle_start(Utc::now(), lookback_secs);
        info!(since = %since, "Starting sync cycle");

        if let Err(e) = use_case.run_cycle(since).await {
            error!(error = %format!("{e:#}"), "Sync cycle failed");
        }
        cycles += 1;

        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    cycles
}

/// Lower bound of the modification window for a cycle starting at `now`
fn cycle_start(now: DateTime<Utc>, lookback_secs: u64) -> DateTime<Utc> {
    i64::try_from(lookback_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ============================================================================
// Startup
// ============================================================================

/// Resolves which configuration file to read
///
/// Returns the path and whether it was named explicitly.
fn config_path<F>(lookup: F) -> (PathBuf, bool)
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(CONFIG_ENV).filter(|v| !v.is_empty()) {
        Some(path) => (PathBuf::from(path), true),
        None => (Config::default_path(), false),
    }
}

/// Loads the configuration file and overlays the environment
///
/// An explicitly named file must exist and parse; the default location falls
/// back to built-in defaults.
fn load_config() -> Result<(Config, PathBuf)> {
    let (path, explicit) = config_path(|key| std::env::var(key).ok());
    let config = if explicit {
        Config::load(&path)?
    } else {
        Config::load_or_default(&path)
    };
    Ok((config.apply_env(), path))
}

/// Initializes the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_path) = load_config().context("Failed to load configuration")?;

    init_tracing(&config.logging);
    info!(config_path = %config_path.display(), "CRMSync daemon starting (crmsyncd)");

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("Configuration has {} error(s)", errors.len());
    }

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token).await?;
    let result = service.run().await;

    match &result {
        Ok(()) => info!("CRMSync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "CRMSync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

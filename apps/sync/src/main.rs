//! McpIndex sync entry point.
//!
//! Runs one registry sync against the data directory and exits. Meant to be
//! scheduled (cron, CI) one run at a time.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use mcpindex_core::{env_keys, SyncConfig, SyncOrchestrator};
use mcpindex_storage::{JsonSnapshotRepository, JsonSyncStateRepository};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

const LOG_DIR_ENV: &str = "MCPINDEX_LOG_DIR";
const LOG_PREFIX: &str = "mcpindex-sync";

/// Initialize tracing with console logging and, when `MCPINDEX_LOG_DIR` is
/// set, a daily-rotated log file.
///
/// The returned guard must stay alive for the file layer to flush.
fn init_tracing() -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // RUST_LOG takes precedence
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,mcpindex_core=debug,mcpindex_storage=debug,mcpindex_sync=debug")
    });

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV).ok().filter(|d| !d.is_empty()) {
        Some(dir) => {
            let logs_dir = PathBuf::from(dir);
            std::fs::create_dir_all(&logs_dir)
                .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))?;

            // Creates files like: mcpindex-sync.2026-01-22.log
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_PREFIX)
                .filename_suffix("log")
                .build(&logs_dir)
                .context("Failed to create log file appender")?;
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run() -> Result<()> {
    let config = SyncConfig::from_env().context("Invalid configuration")?;
    info!(
        data_dir = ?config.data_dir,
        registry = %config.registry_url,
        force_full = config.force_full,
        concurrency = config.enrich.concurrency,
        delay_ms = config.enrich.delay.as_millis() as u64,
        github_token = config.credentials.github_token.is_some(),
        gitlab_token = config.credentials.gitlab_token.is_some(),
        "[Sync] Configuration loaded"
    );
    if config.credentials.github_token.is_none() {
        info!(
            "[Sync] {} not set, GitHub requests use the anonymous rate limit",
            env_keys::GITHUB_TOKEN
        );
    }

    let snapshots = Arc::new(JsonSnapshotRepository::new(config.snapshot_path()));
    let sync_state = Arc::new(JsonSyncStateRepository::new(config.sync_state_path()));

    let orchestrator = SyncOrchestrator::from_config(config, snapshots, sync_state)?;
    orchestrator.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    // Keep the guard alive for the entire program - dropping it stops file logging
    let _log_guard = match init_tracing() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting McpIndex sync v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[Sync] Run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

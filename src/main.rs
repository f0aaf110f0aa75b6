use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use composer::app::{install_metrics_exporter, Application};
use composer::shutdown::ShutdownManager;
use composer_core::config::AppConfig;
use composer_core::logging::{init_logging, LogFormat};
use tokio::signal;
use tracing::{error, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("composer")
        .version("1.0.0")
        .about("Composed node orchestration service")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("member-id")
                .long("member-id")
                .value_name("ID")
                .help("Cluster member id (defaults to hostname plus a random suffix)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Overrides observability.log_level")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Overrides observability.log_format")
                .value_parser(["json", "pretty", "compact"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let mut config = AppConfig::load(config_path.map(String::as_str)).with_context(|| {
        format!(
            "failed to load configuration from {}",
            config_path.map(String::as_str).unwrap_or("defaults")
        )
    })?;

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format
            .parse::<LogFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    init_logging(&config.observability.log_config())?;
    info!(config = config_path.map(String::as_str).unwrap_or("defaults"), "starting composer");

    if config.observability.metrics_enabled {
        install_metrics_exporter(&config.observability)?;
    }

    let member_id = matches.get_one::<String>("member-id").cloned();
    let app = Arc::new(Application::new(config, member_id).await?);
    let shutdown_manager = ShutdownManager::new();

    let app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx, SHUTDOWN_TIMEOUT).await {
                error!("composer stopped with error: {e}");
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping gracefully");
    shutdown_manager.shutdown().await;

    match tokio::time::timeout(SHUTDOWN_TIMEOUT + Duration::from_secs(5), app_handle).await {
        Ok(Ok(())) => info!("composer stopped"),
        Ok(Err(e)) => error!("composer task failed during shutdown: {e}"),
        Err(_) => warn!("shutdown timed out, exiting"),
    }
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

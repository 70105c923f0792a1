mod bootstrap;
mod engine;
mod executors;
mod health;
mod replies;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use rolobot_core::config::{AppConfig, ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "rolobot-server",
    about = "Conversational personal-CRM backend",
    long_about = "Runs the chat command backend: update polling, conversation state, \
                  intent classification, and the records store."
)]
struct Cli {
    #[arg(long, help = "Path to rolobot.toml")]
    config: Option<PathBuf>,
    #[arg(long, help = "Override the sqlite database URL")]
    database_url: Option<String>,
    #[arg(long, help = "Override the logging level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
}

fn init_logging(config: &AppConfig) {
    use rolobot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions {
        config_path: cli.config,
        require_file: false,
        overrides: ConfigOverrides {
            database_url: cli.database_url,
            log_level: cli.log_level,
            ..ConfigOverrides::default()
        },
    })?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    tracing::info!(event_name = "system.server.started", "rolobot-server started");

    tokio::select! {
        result = app.poller.start() => {
            result?;
            tracing::info!(event_name = "system.server.poller_stopped", "update poller stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(event_name = "system.server.stopping", "shutdown signal received");
        }
    }

    let shutdown_window = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(shutdown_window, app.db_pool.close()).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            "database pool did not drain within the shutdown window"
        );
    }

    Ok(())
}

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use rolobot_agent::{IntentRouter, LlmError, OpenAiCompatClient};
use rolobot_core::config::{AppConfig, ConfigError, LoadOptions};
use rolobot_db::repositories::{SqlPersonRepository, SqlSessionRepository, SqlTaskRepository};
use rolobot_db::{connect_with_settings, migrations, DbPool};
use rolobot_telegram::api::{HttpChatApi, TransportError};
use rolobot_telegram::poller::{HttpUpdateTransport, PollRunner, ReconnectPolicy};

use crate::engine::{CommandEngine, SharedSecretPolicy};

/// Outbound sends are short round trips, unlike the long-poll reads.
const SEND_TIMEOUT_SECS: u64 = 10;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub poller: PollRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("chat transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let chat = Arc::new(HttpChatApi::new(
        config.telegram.api_base_url.clone(),
        config.telegram.bot_token.clone(),
        SEND_TIMEOUT_SECS,
    )?);

    let llm = OpenAiCompatClient::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        config.llm.timeout_secs,
        config.llm.max_retries,
    )?;
    let classifier =
        Arc::new(IntentRouter::new(llm, config.llm.temperature, config.llm.max_output_tokens));

    let engine = Arc::new(CommandEngine::new(
        Arc::new(SqlSessionRepository::new(db_pool.clone())),
        Arc::new(SqlPersonRepository::new(db_pool.clone())),
        Arc::new(SqlTaskRepository::new(db_pool.clone())),
        chat,
        classifier,
        Arc::new(SharedSecretPolicy::new(config.auth.shared_secret.clone())),
    ));

    let transport = Arc::new(HttpUpdateTransport::new(
        config.telegram.api_base_url.clone(),
        config.telegram.bot_token.clone(),
        config.telegram.poll_timeout_secs,
    )?);
    let poller = PollRunner::new(transport, engine, ReconnectPolicy::default());

    Ok(Application { config, db_pool, poller })
}

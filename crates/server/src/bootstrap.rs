use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tracing::info;

use brainrelay_agent::{OrchestratorSettings, QuivrClient, ThreadOrchestrator};
use brainrelay_core::config::{AppConfig, ConfigError, LoadOptions};
use brainrelay_core::errors::{ChatPlatformError, RemoteApiError};
use brainrelay_db::{connect_with_config, migrations, DbPool, SqlThreadStateRepository};
use brainrelay_slack::events::{relay_dispatcher, EventDispatcher};
use brainrelay_slack::signature::SignatureVerifier;
use brainrelay_slack::web_api::SlackWebClient;

use crate::health;
use crate::webhook::{self, WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub webhook: WebhookState,
}

impl Application {
    /// Webhook routes plus `/health`, ready for `axum::serve`.
    pub fn router(&self) -> Router {
        webhook::router(self.webhook.clone()).merge(health::router(self.db_pool.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("slack client setup failed: {0}")]
    SlackClient(#[source] ChatPlatformError),
    #[error("quivr client setup failed: {0}")]
    QuivrClient(#[source] RemoteApiError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let chat = SlackWebClient::from_config(&config.slack).map_err(BootstrapError::SlackClient)?;
    let api = QuivrClient::from_config(&config.quivr).map_err(BootstrapError::QuivrClient)?;
    let orchestrator = Arc::new(ThreadOrchestrator::new(
        Arc::new(SqlThreadStateRepository::new(db_pool.clone())),
        Arc::new(api),
        Arc::new(chat),
        OrchestratorSettings::from(&config.quivr),
    ));
    let dispatcher: Arc<EventDispatcher> = Arc::new(relay_dispatcher(orchestrator));

    let verifier = config.slack.signing_secret.clone().map(SignatureVerifier::new);
    info!(
        event_name = "system.bootstrap.relay_ready",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        signature_verification = verifier.is_some(),
        "relay wired"
    );

    let webhook = WebhookState::new(dispatcher, verifier);
    Ok(Application { config, db_pool, webhook })
}

#[cfg(test)]
mod tests {
    use brainrelay_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                quivr_api_key: Some("quivr-test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_bot_token: Some("xapp-wrong-kind".to_string()),
                quivr_api_key: Some("quivr-test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.bot_token"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_builds_the_relay() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('thread_session', 'thread_knowledge_base', 'thread_pending_question', \
              'thread_transient_message')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("thread-state tables should exist after bootstrap");
        assert_eq!(table_count, 4);
        assert_eq!(app.webhook.in_flight(), 0);

        app.db_pool.close().await;
    }
}

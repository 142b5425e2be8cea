use std::sync::Arc;

use bonusbot_core::config::{AppConfig, ConfigError, LoadOptions};
use bonusbot_core::{
    Conversation, ConversationService, InMemorySessionStore, LookupPipeline, SheetFetchError,
    TracingAuditSink,
};
use bonusbot_sheets::GoogleSheetsClient;
use bonusbot_slack::events::default_dispatcher;
use bonusbot_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub conversation: Arc<dyn Conversation>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sheet client setup failed: {0}")]
    SheetClient(#[source] SheetFetchError),
}

/// The chat process always needs both Slack tokens.
pub fn load_config(options: LoadOptions) -> Result<AppConfig, BootstrapError> {
    Ok(AppConfig::load(LoadOptions { require_slack_tokens: true, ..options })?)
}

/// Wires the sheet client, session store and conversation service into the
/// Slack runner. The config must already be validated.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let sheets = GoogleSheetsClient::new(&config.sheets).map_err(BootstrapError::SheetClient)?;
    let pipeline = LookupPipeline::new(Arc::new(sheets), &config.sheets, &config.report);
    let conversation: Arc<dyn Conversation> = Arc::new(ConversationService::new(
        Arc::new(InMemorySessionStore::new()),
        pipeline,
        Arc::new(TracingAuditSink),
    ));
    info!(
        event_name = "system.bootstrap.conversation_ready",
        correlation_id = "bootstrap",
        spreadsheet_id = %config.sheets.spreadsheet_id,
        roster_sheet = %config.sheets.roster.sheet,
        "conversation service initialized"
    );

    // TODO: replace the noop transport with a Socket Mode websocket client
    // (apps.connections.open + chat.postMessage) using the configured tokens.
    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        default_dispatcher(conversation.clone()),
        ReconnectPolicy::default(),
    );

    Ok(Application { config, conversation, slack_runner })
}

#[cfg(test)]
mod tests {
    use bonusbot_core::config::{ConfigOverrides, LoadOptions};
    use bonusbot_core::UserId;

    use crate::bootstrap::{bootstrap_with_config, load_config, Application, BootstrapError};

    fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(load_config(options)?)
    }

    fn valid_overrides() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                spreadsheet_id: Some("sheet-123".to_string()),
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[test]
    fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                spreadsheet_id: Some("sheet-123".to_string()),
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[test]
    fn bootstrap_fails_fast_without_spreadsheet_id() {
        let mut options = valid_overrides();
        options.overrides.spreadsheet_id = None;

        let message = bootstrap(options).err().expect("error").to_string();
        assert!(message.contains("sheets.spreadsheet_id"));
    }

    #[tokio::test]
    async fn bootstrap_wires_a_working_conversation_and_noop_runner() {
        let app = bootstrap(valid_overrides()).expect("bootstrap should succeed");

        assert!(app.slack_runner.is_noop_transport());
        assert_eq!(app.conversation.active_sessions().await, 0);

        app.conversation.start(&UserId::new("U1"), "bootstrap-test").await;
        assert_eq!(app.conversation.active_sessions().await, 1);

        app.slack_runner.start().await.expect("noop runner returns once its stream closes");
    }
}

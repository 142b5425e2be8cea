use std::sync::Arc;

use bonusbot_core::{Conversation, UserId};
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

pub const BONUS_COMMAND: &str = "/bonus";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BonusCommand {
    Start,
    Cancel,
    Help,
    Unknown { verb: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: BonusCommand,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

pub fn normalize_bonus_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != BONUS_COMMAND {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    Ok(CommandEnvelope {
        command: parse_bonus_command(&payload.text),
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_ts: payload.trigger_ts,
        request_id: payload.request_id,
    })
}

/// Empty text starts a lookup; only the first word is significant.
pub fn parse_bonus_command(input: &str) -> BonusCommand {
    let verb = input.split_whitespace().next().unwrap_or_default().to_lowercase();
    match verb.as_str() {
        "" | "start" | "restart" | "new" => BonusCommand::Start,
        "cancel" | "stop" => BonusCommand::Cancel,
        "help" => BonusCommand::Help,
        _ => BonusCommand::Unknown { verb },
    }
}

pub struct CommandRouter {
    conversation: Arc<dyn Conversation>,
}

impl CommandRouter {
    pub fn new(conversation: Arc<dyn Conversation>) -> Self {
        Self { conversation }
    }

    pub async fn route(
        &self,
        envelope: &CommandEnvelope,
        correlation_id: &str,
    ) -> Option<MessageTemplate> {
        let user_id = UserId::new(envelope.user_id.clone());
        let reply = match &envelope.command {
            BonusCommand::Start => self.conversation.start(&user_id, correlation_id).await,
            BonusCommand::Cancel => self.conversation.cancel(&user_id, correlation_id).await,
            BonusCommand::Help => return Some(blocks::help_message()),
            BonusCommand::Unknown { verb } => {
                let summary = format!(
                    "Unsupported command `{BONUS_COMMAND} {verb}`. Try `{BONUS_COMMAND} help`."
                );
                return Some(blocks::error_message(&summary, correlation_id));
            }
        };
        blocks::reply_message(&reply)
    }
}

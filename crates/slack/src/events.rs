use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bonusbot_core::{Conversation, UserId};
use thiserror::Error;
use tracing::debug;

use crate::{
    blocks::{self, MessageTemplate, CANCEL_ACTION, PERIOD_SELECT_ACTION, ROLE_SELECT_ACTION},
    commands::{normalize_bonus_command, CommandParseError, CommandRouter, SlashCommandPayload},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    DirectMessage(DirectMessageEvent),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::DirectMessage(_) => SlackEventType::DirectMessage,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::SlashCommand(payload) => Some(&payload.user_id),
            Self::DirectMessage(event) => Some(&event.user_id),
            Self::BlockAction(event) => Some(&event.user_id),
            Self::Unsupported { .. } => None,
        }
    }

    /// Where a reply to this event is posted.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::SlashCommand(payload) => Some(&payload.channel_id),
            Self::DirectMessage(event) => Some(&event.channel_id),
            Self::BlockAction(event) => Some(&event.channel_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    DirectMessage,
    BlockAction,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectMessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    /// Set for messages posted by bots, including this one.
    pub bot_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub action_id: String,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher(conversation: Arc<dyn Conversation>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(conversation.clone()));
    dispatcher.register(DirectMessageHandler::new(conversation.clone()));
    dispatcher.register(BlockActionHandler::new(conversation));
    dispatcher
}

fn responded(message: Option<MessageTemplate>) -> HandlerResult {
    match message {
        Some(message) => HandlerResult::Responded(message),
        None => HandlerResult::Processed,
    }
}

pub struct SlashCommandHandler {
    router: CommandRouter,
}

impl SlashCommandHandler {
    pub fn new(conversation: Arc<dyn Conversation>) -> Self {
        Self { router: CommandRouter::new(conversation) }
    }
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_bonus_command(payload.clone())?;
        Ok(responded(self.router.route(&normalized, &ctx.correlation_id).await))
    }
}

/// Free text in the bot's direct-message channel. The conversation decides
/// whether it is a role, a period, an identifier or a command.
pub struct DirectMessageHandler {
    conversation: Arc<dyn Conversation>,
}

impl DirectMessageHandler {
    pub fn new(conversation: Arc<dyn Conversation>) -> Self {
        Self { conversation }
    }
}

#[async_trait]
impl EventHandler for DirectMessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::DirectMessage
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::DirectMessage(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.bot_id.is_some() || event.text.trim().is_empty() {
            debug!(
                event_name = "ingress.slack.message_skipped",
                correlation_id = %ctx.correlation_id,
                bot = event.bot_id.is_some(),
                "skipping message without user text"
            );
            return Ok(HandlerResult::Ignored);
        }

        let user_id = UserId::new(event.user_id.clone());
        let reply = self.conversation.handle_text(&user_id, &event.text, &ctx.correlation_id).await;
        Ok(responded(blocks::reply_message(&reply)))
    }
}

pub struct BlockActionHandler {
    conversation: Arc<dyn Conversation>,
}

impl BlockActionHandler {
    pub fn new(conversation: Arc<dyn Conversation>) -> Self {
        Self { conversation }
    }
}

#[async_trait]
impl EventHandler for BlockActionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let user_id = UserId::new(event.user_id.clone());
        let value = event.value.as_deref().unwrap_or_default();
        let correlation_id = ctx.correlation_id.as_str();
        let reply = match event.action_id.as_str() {
            ROLE_SELECT_ACTION => {
                self.conversation.select_role(&user_id, value, correlation_id).await
            }
            PERIOD_SELECT_ACTION => {
                self.conversation.select_period(&user_id, value, correlation_id).await
            }
            CANCEL_ACTION => self.conversation.cancel(&user_id, correlation_id).await,
            other => {
                return Ok(HandlerResult::Responded(blocks::error_message(
                    &format!("The button `{other}` is not supported. Send /bonus to start again."),
                    correlation_id,
                )))
            }
        };
        Ok(responded(blocks::reply_message(&reply)))
    }
}

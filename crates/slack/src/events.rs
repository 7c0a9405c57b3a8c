use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use brainrelay_core::domain::thread::{ChannelId, ThreadId};
use brainrelay_core::errors::RelayError;
use brainrelay_core::outcome::RelayOutcome;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    AppMention(AppMentionEvent),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    AppMention,
    BlockAction,
    Unsupported,
}

impl SlackEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppMention => "app_mention",
            Self::BlockAction => "block_actions",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppMentionEvent {
    pub channel_id: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub user_id: Option<String>,
    pub text: String,
}

impl AppMentionEvent {
    /// Replies always land in a thread: the existing one, or one rooted at this message.
    pub fn thread_id(&self) -> ThreadId {
        ThreadId::new(self.channel(), self.thread_ts.as_deref().unwrap_or(&self.ts))
    }

    pub fn channel(&self) -> ChannelId {
        ChannelId(self.channel_id.clone())
    }

    pub fn mention_token(&self) -> Option<String> {
        self.user_id.as_ref().map(|user_id| format!("<@{user_id}>"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    /// Timestamp of the message carrying the clicked button.
    pub message_ts: String,
    pub thread_ts: Option<String>,
    pub user_id: Option<String>,
    pub action_id: String,
    pub label: Option<String>,
    pub value: Option<String>,
}

impl BlockActionEvent {
    pub fn thread_id(&self) -> ThreadId {
        ThreadId::new(self.channel(), self.thread_ts.as_deref().unwrap_or(&self.message_ts))
    }

    pub fn channel(&self) -> ChannelId {
        ChannelId(self.channel_id.clone())
    }
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
    Relayed(RelayOutcome),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Relay(#[from] RelayError),
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
        let event_type = envelope.event.event_type();
        let Some(handler) = self.handlers.get(&event_type) else {
            return Ok(HandlerResult::Ignored);
        };

        match handler.handle(envelope, ctx).await {
            Ok(result) => {
                let outcome = match &result {
                    HandlerResult::Relayed(outcome) => outcome.as_str(),
                    HandlerResult::Ignored => "ignored",
                };
                info!(
                    event_name = "slack.event.dispatched",
                    correlation_id = %ctx.correlation_id,
                    event_type = event_type.as_str(),
                    outcome,
                    "dispatched slack event"
                );
                Ok(result)
            }
            Err(error) => {
                warn!(
                    event_name = "slack.event.failed",
                    correlation_id = %ctx.correlation_id,
                    event_type = event_type.as_str(),
                    error = %error,
                    "slack event handler failed"
                );
                Err(DispatchError::from(error))
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired for the relay: mentions and button clicks go to one service.
pub fn relay_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: MentionService + BlockActionService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(AppMentionHandler::new(Arc::clone(&service)));
    dispatcher.register(BlockActionHandler::new(service));
    dispatcher
}

#[async_trait]
pub trait MentionService: Send + Sync {
    async fn handle_mention(
        &self,
        event: &AppMentionEvent,
        ctx: &EventContext,
    ) -> Result<RelayOutcome, EventHandlerError>;
}

pub struct AppMentionHandler<S> {
    service: Arc<S>,
}

impl<S> AppMentionHandler<S>
where
    S: MentionService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for AppMentionHandler<S>
where
    S: MentionService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppMention
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppMention(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let outcome = self.service.handle_mention(event, ctx).await?;
        Ok(HandlerResult::Relayed(outcome))
    }
}

#[async_trait]
pub trait BlockActionService: Send + Sync {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<RelayOutcome, EventHandlerError>;
}

pub struct BlockActionHandler<S> {
    service: Arc<S>,
}

impl<S> BlockActionHandler<S>
where
    S: BlockActionService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for BlockActionHandler<S>
where
    S: BlockActionService + 'static,
{
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

        let outcome = self.service.handle_block_action(event, ctx).await?;
        Ok(match outcome {
            RelayOutcome::Ignored => HandlerResult::Ignored,
            other => HandlerResult::Relayed(other),
        })
    }
}

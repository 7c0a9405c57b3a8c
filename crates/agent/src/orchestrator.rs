use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use brainrelay_core::config::QuivrConfig;
use brainrelay_core::domain::answer::Source;
use brainrelay_core::domain::knowledge_base::KnowledgeBaseSelection;
use brainrelay_core::domain::thread::{ChannelId, SessionId, ThreadId, TransientMessage};
use brainrelay_core::errors::{ProtocolViolation, RelayError, StorageError};
use brainrelay_core::formatter::{
    format_answer, EMPTY_QUESTION_MESSAGE, MAX_CITATIONS, NO_ANSWER_MESSAGE,
    NO_KNOWLEDGE_BASES_MESSAGE,
};
use brainrelay_core::mention::strip_mentions;
use brainrelay_core::outcome::RelayOutcome;
use brainrelay_core::selection::{build_selection_prompt, parse_action_id};
use brainrelay_db::repositories::{RepositoryError, ThreadStateRepository};
use brainrelay_slack::blocks::{knowledge_base_prompt_message, text_message};
use brainrelay_slack::events::{
    AppMentionEvent, BlockActionEvent, BlockActionService, EventContext, EventHandlerError,
    MentionService,
};
use brainrelay_slack::web_api::ChatPlatform;

use crate::locks::ThreadLocks;
use crate::quivr::QuestionAnsweringApi;

/// A user addressed the bot in a thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MentionEvent {
    pub thread_id: ThreadId,
    pub channel_id: ChannelId,
    pub raw_text: String,
    pub mention_token: Option<String>,
    pub correlation_id: String,
}

impl MentionEvent {
    pub fn from_slack(event: &AppMentionEvent, ctx: &EventContext) -> Self {
        Self {
            thread_id: event.thread_id(),
            channel_id: event.channel(),
            raw_text: event.text.clone(),
            mention_token: event.mention_token(),
            correlation_id: ctx.correlation_id.clone(),
        }
    }
}

/// A user clicked one of the knowledge-base options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEvent {
    pub thread_id: ThreadId,
    pub channel_id: ChannelId,
    pub action_id: String,
    pub label: Option<String>,
    pub correlation_id: String,
}

impl SelectionEvent {
    pub fn from_slack(event: &BlockActionEvent, ctx: &EventContext) -> Self {
        Self {
            thread_id: event.thread_id(),
            channel_id: event.channel(),
            action_id: event.action_id.clone(),
            label: event.label.clone(),
            correlation_id: ctx.correlation_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Name given to every remote chat session the relay opens.
    pub chat_name: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self { chat_name: "Slack Chat".to_owned() }
    }
}

impl From<&QuivrConfig> for OrchestratorSettings {
    fn from(config: &QuivrConfig) -> Self {
        Self { chat_name: config.chat_name.clone() }
    }
}

pub struct ThreadOrchestrator {
    store: Arc<dyn ThreadStateRepository>,
    api: Arc<dyn QuestionAnsweringApi>,
    chat: Arc<dyn ChatPlatform>,
    locks: ThreadLocks,
    settings: OrchestratorSettings,
}

/// Answer text plus its sources, present only when there is something to post.
type RelayableAnswer = (String, Vec<Source>);

fn storage(error: RepositoryError) -> RelayError {
    RelayError::Storage(StorageError::from(error))
}

impl ThreadOrchestrator {
    pub fn new(
        store: Arc<dyn ThreadStateRepository>,
        api: Arc<dyn QuestionAnsweringApi>,
        chat: Arc<dyn ChatPlatform>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self { store, api, chat, locks: ThreadLocks::new(), settings }
    }

    pub async fn handle_mention(&self, event: &MentionEvent) -> Result<RelayOutcome, RelayError> {
        let _guard = self.locks.acquire(&event.thread_id).await;
        info!(
            event_name = "relay.mention.received",
            correlation_id = %event.correlation_id,
            thread_id = %event.thread_id,
            channel_id = %event.channel_id,
            "handling mention"
        );

        let result = self.mention_flow(event).await;
        self.finish(&event.channel_id, &event.thread_id, &event.correlation_id, result).await
    }

    pub async fn handle_selection(
        &self,
        event: &SelectionEvent,
    ) -> Result<RelayOutcome, RelayError> {
        let selection = match parse_action_id(&event.action_id) {
            Ok(selection) => selection,
            Err(violation) => {
                info!(
                    event_name = "relay.selection.ignored",
                    correlation_id = %event.correlation_id,
                    thread_id = %event.thread_id,
                    reason = %violation,
                    "ignoring non-selection action"
                );
                return Ok(RelayOutcome::Ignored);
            }
        };

        let _guard = self.locks.acquire(&event.thread_id).await;
        info!(
            event_name = "relay.selection.received",
            correlation_id = %event.correlation_id,
            thread_id = %event.thread_id,
            channel_id = %event.channel_id,
            knowledge_base = selection.as_stored(),
            label = event.label.as_deref().unwrap_or(""),
            "handling knowledge-base selection"
        );

        let result = self.selection_flow(event, selection).await;
        self.finish(&event.channel_id, &event.thread_id, &event.correlation_id, result).await
    }

    /// Returns the thread's remote session, creating and storing one if needed.
    ///
    /// At most one session is ever created per thread, however many callers race.
    pub async fn get_or_create_session(
        &self,
        thread_id: &ThreadId,
    ) -> Result<SessionId, RelayError> {
        let _guard = self.locks.acquire(thread_id).await;
        self.session_for(thread_id).await
    }

    // Caller must hold the thread's lock.
    async fn session_for(&self, thread_id: &ThreadId) -> Result<SessionId, RelayError> {
        if let Some(session_id) = self.store.get_session(thread_id).await.map_err(storage)? {
            return Ok(session_id);
        }

        let session_id = self.api.create_session(&self.settings.chat_name).await?;
        self.store.set_session(thread_id, &session_id).await.map_err(storage)?;
        info!(
            event_name = "relay.session.created",
            thread_id = %thread_id,
            session_id = %session_id,
            "created remote chat session"
        );
        Ok(session_id)
    }

    async fn mention_flow(&self, event: &MentionEvent) -> Result<RelayOutcome, RelayError> {
        let thread_id = &event.thread_id;
        let channel_id = &event.channel_id;

        let question = strip_mentions(&event.raw_text, event.mention_token.as_deref());
        if question.is_empty() {
            self.post_text(channel_id, thread_id, EMPTY_QUESTION_MESSAGE).await?;
            return Ok(RelayOutcome::UsageHint);
        }

        self.store.set_pending_question(thread_id, &question).await.map_err(storage)?;

        match self.store.get_knowledge_base(thread_id).await.map_err(storage)? {
            Some(selection) => {
                let outcome =
                    self.ask_and_relay(channel_id, thread_id, &question, &selection).await;
                self.store.clear_pending_question(thread_id).await.map_err(storage)?;
                outcome
            }
            None => self.prompt_for_knowledge_base(channel_id, thread_id).await,
        }
    }

    async fn prompt_for_knowledge_base(
        &self,
        channel_id: &ChannelId,
        thread_id: &ThreadId,
    ) -> Result<RelayOutcome, RelayError> {
        let knowledge_bases = self.api.list_knowledge_bases().await?;
        if knowledge_bases.is_empty() {
            self.post_text(channel_id, thread_id, NO_KNOWLEDGE_BASES_MESSAGE).await?;
            return Ok(RelayOutcome::NoKnowledgeBases);
        }

        let prompt = build_selection_prompt(&knowledge_bases);
        let message_id = self
            .chat
            .post_message(channel_id, thread_id, &knowledge_base_prompt_message(&prompt))
            .await?;
        self.store
            .add_transient_message(thread_id, &TransientMessage::new(channel_id.clone(), message_id))
            .await
            .map_err(storage)?;

        Ok(RelayOutcome::PromptPosted { options: prompt.len() })
    }

    async fn selection_flow(
        &self,
        event: &SelectionEvent,
        selection: KnowledgeBaseSelection,
    ) -> Result<RelayOutcome, RelayError> {
        let thread_id = &event.thread_id;
        let channel_id = &event.channel_id;

        self.store.set_knowledge_base(thread_id, &selection).await.map_err(storage)?;

        let pending = self.store.get_pending_question(thread_id).await.map_err(storage)?;
        let question = pending.map(|question| strip_mentions(&question, None)).unwrap_or_default();
        if question.is_empty() {
            let violation =
                ProtocolViolation::MissingPendingQuestion { thread_id: thread_id.to_string() };
            warn!(
                event_name = "relay.selection.protocol_violation",
                correlation_id = %event.correlation_id,
                thread_id = %thread_id,
                error = %violation,
                "selection arrived without a pending question"
            );
            self.clear_transient_messages(thread_id).await?;
            self.post_text(channel_id, thread_id, NO_ANSWER_MESSAGE).await?;
            return Ok(RelayOutcome::NoAnswer);
        }

        let outcome =
            self.ask_and_relay_after_cleanup(channel_id, thread_id, &question, &selection).await;
        self.store.clear_pending_question(thread_id).await.map_err(storage)?;
        outcome
    }

    async fn ask_and_relay(
        &self,
        channel_id: &ChannelId,
        thread_id: &ThreadId,
        question: &str,
        selection: &KnowledgeBaseSelection,
    ) -> Result<RelayOutcome, RelayError> {
        let answer = self.ask(thread_id, question, selection).await?;
        self.relay(channel_id, thread_id, answer).await
    }

    /// Selection variant: the prompts are removed whatever the backend said.
    async fn ask_and_relay_after_cleanup(
        &self,
        channel_id: &ChannelId,
        thread_id: &ThreadId,
        question: &str,
        selection: &KnowledgeBaseSelection,
    ) -> Result<RelayOutcome, RelayError> {
        let answer = self.ask(thread_id, question, selection).await;
        self.clear_transient_messages(thread_id).await?;
        self.relay(channel_id, thread_id, answer?).await
    }

    /// Resolves the session and submits the question. `Ok(None)` means the
    /// backend could not be asked or gave no answer; storage failures are errors.
    async fn ask(
        &self,
        thread_id: &ThreadId,
        question: &str,
        selection: &KnowledgeBaseSelection,
    ) -> Result<Option<RelayableAnswer>, RelayError> {
        let session_id = match self.session_for(thread_id).await {
            Ok(session_id) => session_id,
            Err(RelayError::RemoteApi(remote)) => {
                warn!(
                    event_name = "relay.session.failed",
                    thread_id = %thread_id,
                    endpoint = remote.endpoint(),
                    status = ?remote.status(),
                    error = %remote,
                    "could not create remote chat session"
                );
                return Ok(None);
            }
            Err(other) => return Err(other),
        };

        let asked = self.api.ask_question(&session_id, question, selection.remote_id()).await;
        let answer = match asked {
            Ok(answer) => answer,
            Err(remote) => {
                warn!(
                    event_name = "relay.question.failed",
                    thread_id = %thread_id,
                    endpoint = remote.endpoint(),
                    status = ?remote.status(),
                    error = %remote,
                    "question submission failed"
                );
                return Ok(None);
            }
        };

        if let Some(echoed) = &answer.knowledge_base_id {
            let echoed = KnowledgeBaseSelection::Specific(echoed.clone());
            if &echoed != selection {
                self.store.set_knowledge_base(thread_id, &echoed).await.map_err(storage)?;
                info!(
                    event_name = "relay.knowledge_base.resolved",
                    thread_id = %thread_id,
                    knowledge_base = echoed.as_stored(),
                    "backend resolved the knowledge base"
                );
            }
        }

        Ok(answer.text().map(|text| (text.to_owned(), answer.sources.clone())))
    }

    async fn relay(
        &self,
        channel_id: &ChannelId,
        thread_id: &ThreadId,
        answer: Option<RelayableAnswer>,
    ) -> Result<RelayOutcome, RelayError> {
        let Some((text, sources)) = answer else {
            self.post_text(channel_id, thread_id, NO_ANSWER_MESSAGE).await?;
            return Ok(RelayOutcome::NoAnswer);
        };

        let formatted = format_answer(&text, &sources);
        for message in formatted.messages() {
            self.post_text(channel_id, thread_id, message).await?;
        }

        Ok(RelayOutcome::Answered {
            chunks: formatted.chunks.len(),
            citations: sources.len().min(MAX_CITATIONS),
        })
    }

    /// Deletes every recorded prompt; individual delete failures are logged and skipped.
    async fn clear_transient_messages(&self, thread_id: &ThreadId) -> Result<(), RelayError> {
        let transients = self.store.list_transient_messages(thread_id).await.map_err(storage)?;
        for transient in &transients {
            if let Err(delete_error) =
                self.chat.delete_message(&transient.channel_id, &transient.message_id).await
            {
                warn!(
                    event_name = "relay.transient.delete_failed",
                    thread_id = %thread_id,
                    channel_id = %transient.channel_id,
                    message_id = %transient.message_id,
                    error = %delete_error,
                    "could not delete knowledge-base prompt"
                );
            }
        }
        self.store.clear_transient_messages(thread_id).await.map_err(storage)
    }

    async fn post_text(
        &self,
        channel_id: &ChannelId,
        thread_id: &ThreadId,
        text: &str,
    ) -> Result<(), RelayError> {
        self.chat.post_message(channel_id, thread_id, &text_message(text)).await?;
        Ok(())
    }

    async fn finish(
        &self,
        channel_id: &ChannelId,
        thread_id: &ThreadId,
        correlation_id: &str,
        result: Result<RelayOutcome, RelayError>,
    ) -> Result<RelayOutcome, RelayError> {
        match &result {
            Ok(outcome) => info!(
                event_name = "relay.event.completed",
                correlation_id,
                thread_id = %thread_id,
                outcome = outcome.as_str(),
                "relay event completed"
            ),
            Err(failure) => {
                error!(
                    event_name = "relay.event.failed",
                    correlation_id,
                    thread_id = %thread_id,
                    kind = failure.kind(),
                    error = %failure,
                    "relay event failed"
                );
                // A chat failure means the fallback would most likely fail too.
                if !matches!(failure, RelayError::ChatPlatform(_)) {
                    if let Err(post_error) =
                        self.post_text(channel_id, thread_id, failure.user_message()).await
                    {
                        warn!(
                            event_name = "relay.fallback.failed",
                            correlation_id,
                            thread_id = %thread_id,
                            error = %post_error,
                            "could not post failure message"
                        );
                    }
                }
            }
        }
        result
    }
}

#[async_trait]
impl MentionService for ThreadOrchestrator {
    async fn handle_mention(
        &self,
        event: &AppMentionEvent,
        ctx: &EventContext,
    ) -> Result<RelayOutcome, EventHandlerError> {
        ThreadOrchestrator::handle_mention(self, &MentionEvent::from_slack(event, ctx))
            .await
            .map_err(EventHandlerError::from)
    }
}

#[async_trait]
impl BlockActionService for ThreadOrchestrator {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<RelayOutcome, EventHandlerError> {
        self.handle_selection(&SelectionEvent::from_slack(event, ctx))
            .await
            .map_err(EventHandlerError::from)
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::knowledge_base::KnowledgeBaseSelection;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// A conversation thread: its channel plus the timestamp of the root message.
///
/// Slack timestamps are only unique within a channel, so the channel is part
/// of the identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId {
    pub channel_id: ChannelId,
    pub ts: String,
}

impl ThreadId {
    pub fn new(channel_id: ChannelId, ts: impl Into<String>) -> Self {
        Self { channel_id, ts: ts.into() }
    }
}

/// Timestamp of a posted message; unique within its channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Remote chat session id issued by the question-answering backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel_id, self.ts)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A selection prompt posted while the thread waits for a knowledge-base choice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransientMessage {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl TransientMessage {
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self { channel_id, message_id }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadState {
    pub thread_id: ThreadId,
    pub session_id: Option<SessionId>,
    pub knowledge_base: Option<KnowledgeBaseSelection>,
    pub pending_question: Option<String>,
    pub transient_messages: Vec<TransientMessage>,
}

impl ThreadState {
    pub fn new(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            session_id: None,
            knowledge_base: None,
            pending_question: None,
            transient_messages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.session_id.is_none()
            && self.knowledge_base.is_none()
            && self.pending_question.is_none()
            && self.transient_messages.is_empty()
    }

    pub fn awaiting_selection(&self) -> bool {
        self.knowledge_base.is_none() && !self.transient_messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelId, MessageId, ThreadId, ThreadState, TransientMessage};
    use crate::domain::knowledge_base::KnowledgeBaseSelection;

    fn thread(channel: &str, ts: &str) -> ThreadId {
        ThreadId::new(ChannelId(channel.to_owned()), ts)
    }

    #[test]
    fn fresh_thread_state_is_empty() {
        let state = ThreadState::new(thread("C1", "1730000000.1000"));
        assert!(state.is_empty());
        assert!(!state.awaiting_selection());
    }

    #[test]
    fn thread_with_prompts_and_no_selection_is_awaiting_selection() {
        let mut state = ThreadState::new(thread("C1", "1730000000.1000"));
        state.transient_messages.push(TransientMessage::new(
            ChannelId("C1".to_owned()),
            MessageId("1730000000.2000".to_owned()),
        ));
        assert!(state.awaiting_selection());

        state.knowledge_base = Some(KnowledgeBaseSelection::Any);
        assert!(!state.awaiting_selection());
    }

    #[test]
    fn same_timestamp_in_different_channels_is_a_different_thread() {
        let in_a = thread("C_A", "1700000000.000100");
        let in_b = thread("C_B", "1700000000.000100");

        assert_ne!(in_a, in_b);
        assert_eq!(in_a.to_string(), "C_A:1700000000.000100");
    }
}

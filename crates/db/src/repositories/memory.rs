use std::collections::HashMap;

use tokio::sync::RwLock;

use brainrelay_core::domain::knowledge_base::KnowledgeBaseSelection;
use brainrelay_core::domain::thread::{SessionId, ThreadId, ThreadState, TransientMessage};

use super::{RepositoryError, ThreadStateRepository};

#[derive(Default)]
pub struct InMemoryThreadStateRepository {
    threads: RwLock<HashMap<ThreadId, ThreadState>>,
}

impl InMemoryThreadStateRepository {
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[async_trait::async_trait]
impl ThreadStateRepository for InMemoryThreadStateRepository {
    async fn get_session(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<SessionId>, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|state| state.session_id.clone()))
    }

    async fn set_session(
        &self,
        thread_id: &ThreadId,
        session_id: &SessionId,
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.clone())
            .or_insert_with(|| ThreadState::new(thread_id.clone()))
            .session_id = Some(session_id.clone());
        Ok(())
    }

    async fn get_knowledge_base(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<KnowledgeBaseSelection>, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|state| state.knowledge_base.clone()))
    }

    async fn set_knowledge_base(
        &self,
        thread_id: &ThreadId,
        selection: &KnowledgeBaseSelection,
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.clone())
            .or_insert_with(|| ThreadState::new(thread_id.clone()))
            .knowledge_base = Some(selection.clone());
        Ok(())
    }

    async fn get_pending_question(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<String>, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|state| state.pending_question.clone()))
    }

    async fn set_pending_question(
        &self,
        thread_id: &ThreadId,
        question: &str,
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.clone())
            .or_insert_with(|| ThreadState::new(thread_id.clone()))
            .pending_question = Some(question.to_owned());
        Ok(())
    }

    async fn clear_pending_question(&self, thread_id: &ThreadId) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        if let Some(state) = threads.get_mut(thread_id) {
            state.pending_question = None;
        }
        Ok(())
    }

    async fn add_transient_message(
        &self,
        thread_id: &ThreadId,
        message: &TransientMessage,
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        let state =
            threads.entry(thread_id.clone()).or_insert_with(|| ThreadState::new(thread_id.clone()));
        if !state.transient_messages.contains(message) {
            state.transient_messages.push(message.clone());
        }
        Ok(())
    }

    async fn list_transient_messages(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Vec<TransientMessage>, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).map(|state| state.transient_messages.clone()).unwrap_or_default())
    }

    async fn clear_transient_messages(&self, thread_id: &ThreadId) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        if let Some(state) = threads.get_mut(thread_id) {
            state.transient_messages.clear();
        }
        Ok(())
    }

    async fn find_thread(&self, thread_id: &ThreadId) -> Result<ThreadState, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_else(|| ThreadState::new(thread_id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use brainrelay_core::domain::knowledge_base::KnowledgeBaseSelection;
    use brainrelay_core::domain::thread::{
        ChannelId, MessageId, SessionId, ThreadId, TransientMessage,
    };

    use crate::repositories::{InMemoryThreadStateRepository, ThreadStateRepository};

    #[tokio::test]
    async fn in_memory_thread_state_round_trip() {
        let repo = InMemoryThreadStateRepository::default();
        let thread = ThreadId::new(ChannelId("C1".to_string()), "T-1");

        repo.set_session(&thread, &SessionId("chat-1".to_string())).await.expect("session");
        repo.set_knowledge_base(&thread, &KnowledgeBaseSelection::Any).await.expect("kb");
        repo.set_pending_question(&thread, "what is X").await.expect("question");
        let prompt = TransientMessage::new(ChannelId("C1".to_string()), MessageId("1.0".to_string()));
        repo.add_transient_message(&thread, &prompt).await.expect("transient");
        repo.add_transient_message(&thread, &prompt).await.expect("duplicate transient");

        let state = repo.find_thread(&thread).await.expect("find");
        assert_eq!(state.session_id, Some(SessionId("chat-1".to_string())));
        assert_eq!(state.knowledge_base, Some(KnowledgeBaseSelection::Any));
        assert_eq!(state.pending_question.as_deref(), Some("what is X"));
        assert_eq!(state.transient_messages, vec![prompt]);
        assert_eq!(repo.thread_count().await, 1);
    }

    #[tokio::test]
    async fn clearing_unknown_thread_is_a_no_op() {
        let repo = InMemoryThreadStateRepository::default();
        let thread = ThreadId::new(ChannelId("C1".to_string()), "T-missing");

        repo.clear_pending_question(&thread).await.expect("clear question");
        repo.clear_transient_messages(&thread).await.expect("clear transients");

        assert!(repo.find_thread(&thread).await.expect("find").is_empty());
        assert_eq!(repo.thread_count().await, 0);
    }
}

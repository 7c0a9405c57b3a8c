use async_trait::async_trait;
use thiserror::Error;

use brainrelay_core::domain::knowledge_base::KnowledgeBaseSelection;
use brainrelay_core::domain::thread::{SessionId, ThreadId, ThreadState, TransientMessage};
use brainrelay_core::errors::StorageError;

pub mod memory;
pub mod thread_state;

pub use memory::InMemoryThreadStateRepository;
pub use thread_state::SqlThreadStateRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StorageError {
    fn from(error: RepositoryError) -> Self {
        StorageError(error.to_string())
    }
}

/// Durable per-thread relay state.
///
/// Single-valued fields are insert-or-replace; transient messages are
/// insert-or-append and listed in insertion order. Nothing here serializes
/// callers: read-modify-write sequences are the orchestrator's job.
#[async_trait]
pub trait ThreadStateRepository: Send + Sync {
    async fn get_session(&self, thread_id: &ThreadId)
        -> Result<Option<SessionId>, RepositoryError>;
    async fn set_session(
        &self,
        thread_id: &ThreadId,
        session_id: &SessionId,
    ) -> Result<(), RepositoryError>;

    async fn get_knowledge_base(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<KnowledgeBaseSelection>, RepositoryError>;
    async fn set_knowledge_base(
        &self,
        thread_id: &ThreadId,
        selection: &KnowledgeBaseSelection,
    ) -> Result<(), RepositoryError>;

    async fn get_pending_question(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<String>, RepositoryError>;
    async fn set_pending_question(
        &self,
        thread_id: &ThreadId,
        question: &str,
    ) -> Result<(), RepositoryError>;
    async fn clear_pending_question(&self, thread_id: &ThreadId) -> Result<(), RepositoryError>;

    async fn add_transient_message(
        &self,
        thread_id: &ThreadId,
        message: &TransientMessage,
    ) -> Result<(), RepositoryError>;
    async fn list_transient_messages(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Vec<TransientMessage>, RepositoryError>;
    async fn clear_transient_messages(&self, thread_id: &ThreadId) -> Result<(), RepositoryError>;

    async fn find_thread(&self, thread_id: &ThreadId) -> Result<ThreadState, RepositoryError> {
        Ok(ThreadState {
            thread_id: thread_id.clone(),
            session_id: self.get_session(thread_id).await?,
            knowledge_base: self.get_knowledge_base(thread_id).await?,
            pending_question: self.get_pending_question(thread_id).await?,
            transient_messages: self.list_transient_messages(thread_id).await?,
        })
    }
}

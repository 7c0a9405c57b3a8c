use chrono::Utc;
use sqlx::Row;

use brainrelay_core::domain::knowledge_base::KnowledgeBaseSelection;
use brainrelay_core::domain::thread::{ChannelId, MessageId, SessionId, ThreadId, TransientMessage};

use super::{RepositoryError, ThreadStateRepository};
use crate::DbPool;

pub struct SqlThreadStateRepository {
    pool: DbPool,
}

impl SqlThreadStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_transient(row: &sqlx::sqlite::SqliteRow) -> Result<TransientMessage, RepositoryError> {
    let channel_id: String =
        row.try_get("channel_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message_id: String =
        row.try_get("message_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(TransientMessage::new(ChannelId(channel_id), MessageId(message_id)))
}

#[async_trait::async_trait]
impl ThreadStateRepository for SqlThreadStateRepository {
    async fn get_session(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<SessionId>, RepositoryError> {
        let row = sqlx::query(
            "SELECT session_id FROM thread_session WHERE channel_id = ? AND thread_ts = ?",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => {
                let session_id: String =
                    r.try_get("session_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(SessionId(session_id)))
            }
            None => Ok(None),
        }
    }

    async fn set_session(
        &self,
        thread_id: &ThreadId,
        session_id: &SessionId,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO thread_session (channel_id, thread_ts, session_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(channel_id, thread_ts) DO UPDATE SET
                 session_id = excluded.session_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .bind(&session_id.0)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_knowledge_base(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<KnowledgeBaseSelection>, RepositoryError> {
        let row = sqlx::query(
            "SELECT knowledge_base_id FROM thread_knowledge_base
             WHERE channel_id = ? AND thread_ts = ?",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => {
                let stored: String = r
                    .try_get("knowledge_base_id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(KnowledgeBaseSelection::from_stored(&stored)))
            }
            None => Ok(None),
        }
    }

    async fn set_knowledge_base(
        &self,
        thread_id: &ThreadId,
        selection: &KnowledgeBaseSelection,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO thread_knowledge_base (channel_id, thread_ts, knowledge_base_id, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(channel_id, thread_ts) DO UPDATE SET
                 knowledge_base_id = excluded.knowledge_base_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .bind(selection.as_stored())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pending_question(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query(
            "SELECT question FROM thread_pending_question WHERE channel_id = ? AND thread_ts = ?",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => {
                let question: String =
                    r.try_get("question").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(question))
            }
            None => Ok(None),
        }
    }

    async fn set_pending_question(
        &self,
        thread_id: &ThreadId,
        question: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO thread_pending_question (channel_id, thread_ts, question, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(channel_id, thread_ts) DO UPDATE SET
                 question = excluded.question,
                 updated_at = excluded.updated_at",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .bind(question)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_pending_question(&self, thread_id: &ThreadId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM thread_pending_question WHERE channel_id = ? AND thread_ts = ?")
            .bind(&thread_id.channel_id.0)
            .bind(&thread_id.ts)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn add_transient_message(
        &self,
        thread_id: &ThreadId,
        message: &TransientMessage,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO thread_transient_message
                 (thread_channel_id, thread_ts, channel_id, message_id, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(channel_id, message_id) DO NOTHING",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .bind(&message.channel_id.0)
        .bind(&message.message_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_transient_messages(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Vec<TransientMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT channel_id, message_id
             FROM thread_transient_message
             WHERE thread_channel_id = ? AND thread_ts = ?
             ORDER BY seq ASC",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transient).collect()
    }

    async fn clear_transient_messages(&self, thread_id: &ThreadId) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM thread_transient_message WHERE thread_channel_id = ? AND thread_ts = ?",
        )
        .bind(&thread_id.channel_id.0)
        .bind(&thread_id.ts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

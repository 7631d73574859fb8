//! Message repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::MessageId;
use chathub_entity::message::{Message, NewMessage};

use crate::store::MessageStore;

/// Repository for chat messages.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn create_message(&self, message: NewMessage) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            r#"INSERT INTO messages (id, chat_id, sender_id, content, type, attachments, reply_to_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(MessageId::new())
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.kind)
        .bind(&message.attachments)
        .bind(message.reply_to_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to create message", e))
    }

    async fn find_message(&self, id: MessageId) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to find message", e))
    }

    async fn mark_read(&self, id: MessageId) -> AppResult<Message> {
        sqlx::query_as::<_, Message>("UPDATE messages SET read = TRUE WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to mark message read", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("Message {id} not found")))
    }
}

//! Chat repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::{ChatId, UserId};
use chathub_entity::chat::Chat;

use crate::store::ChatStore;

/// Repository for conversations and membership.
#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    /// Create a new chat repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for ChatRepository {
    async fn find_chat(&self, id: ChatId) -> AppResult<Option<Chat>> {
        sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to find chat", e))
    }

    async fn participants(&self, chat: ChatId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM chat_participants WHERE chat_id = $1",
        )
        .bind(chat)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to list chat participants", e)
        })
    }

    async fn touch(&self, chat: ChatId, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(chat)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to touch chat", e))?;
        Ok(())
    }
}

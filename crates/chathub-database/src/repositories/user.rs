//! User repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_entity::user::UserSummary;

use crate::store::UserStore;

/// Repository for user lookups and presence updates.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_user(&self, id: UserId) -> AppResult<Option<UserSummary>> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, username, avatar, is_online, last_seen FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to find user by id", e))
    }

    async fn set_presence(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET is_online = $2, last_seen = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_online)
        .bind(last_seen)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to update presence", e))?;
        Ok(())
    }
}

//! Contact repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_entity::contact::Contact;

use crate::store::ContactStore;

/// Repository for contact edges.
#[derive(Debug, Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    /// Create a new contact repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for ContactRepository {
    async fn find_contact(&self, owner: UserId, contact: UserId) -> AppResult<Option<Contact>> {
        sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE user_id = $1 AND contact_id = $2",
        )
        .bind(owner)
        .bind(contact)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to find contact", e))
    }

    async fn watchers_of(&self, user: UserId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>("SELECT user_id FROM contacts WHERE contact_id = $1")
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to list contact watchers", e)
            })
    }
}

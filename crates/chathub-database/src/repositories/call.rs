//! Call repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, UserId};
use chathub_entity::call::{Call, CallStatus, CallTransition, NewCall};

use crate::store::CallStore;

/// Repository for call rows.
#[derive(Debug, Clone)]
pub struct CallRepository {
    pool: PgPool,
}

impl CallRepository {
    /// Create a new call repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallStore for CallRepository {
    async fn create_call(&self, call: NewCall) -> AppResult<Call> {
        sqlx::query_as::<_, Call>(
            r#"INSERT INTO calls (id, caller_id, receiver_id, type, status)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(CallId::new())
        .bind(call.caller_id)
        .bind(call.receiver_id)
        .bind(call.call_type)
        .bind(CallStatus::Ringing)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to create call", e))
    }

    async fn find_call(&self, id: CallId) -> AppResult<Option<Call>> {
        sqlx::query_as::<_, Call>("SELECT * FROM calls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to find call", e))
    }

    async fn apply_transition(
        &self,
        id: CallId,
        expected: &[CallStatus],
        transition: CallTransition,
    ) -> AppResult<Option<Call>> {
        let (started_at, ended_at, duration) = match transition {
            CallTransition::Answer { at } => (Some(at), None, None),
            CallTransition::Reject { at } | CallTransition::Miss { at } => (None, Some(at), None),
            CallTransition::End { at, duration } => (None, Some(at), Some(duration)),
        };

        // The status guard in the WHERE clause makes concurrent transitions
        // on the same call race on a single row update; only one wins.
        sqlx::query_as::<_, Call>(
            r#"UPDATE calls
               SET status = $3,
                   started_at = COALESCE($4, started_at),
                   ended_at = COALESCE($5, ended_at),
                   duration = COALESCE($6, duration)
               WHERE id = $1 AND status = ANY($2)
               RETURNING *"#,
        )
        .bind(id)
        .bind(expected.to_vec())
        .bind(transition.target())
        .bind(started_at)
        .bind(ended_at)
        .bind(duration)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to {} call", transition.verb()),
                e,
            )
        })
    }

    async fn history(&self, user: UserId, limit: i64) -> AppResult<Vec<Call>> {
        sqlx::query_as::<_, Call>(
            r#"SELECT * FROM calls
               WHERE caller_id = $1 OR receiver_id = $1
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(user)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to list call history", e))
    }

    async fn delete_call(&self, id: CallId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM calls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to delete call", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn stale_ringing(&self, before: DateTime<Utc>) -> AppResult<Vec<Call>> {
        sqlx::query_as::<_, Call>(
            "SELECT * FROM calls WHERE status = $1 AND created_at < $2 ORDER BY created_at",
        )
        .bind(CallStatus::Ringing)
        .bind(before)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to list ringing calls", e)
        })
    }
}

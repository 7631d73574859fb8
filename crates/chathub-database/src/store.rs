//! Narrow storage interfaces consumed by the real-time layer.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chathub_core::result::AppResult;
use chathub_core::types::{CallId, ChatId, MessageId, UserId};
use chathub_entity::call::{Call, CallStatus, CallTransition, NewCall};
use chathub_entity::chat::Chat;
use chathub_entity::contact::Contact;
use chathub_entity::message::{Message, NewMessage};
use chathub_entity::user::UserSummary;

/// User lookups and presence columns.
#[async_trait]
pub trait UserStore: Send + Sync + Debug + 'static {
    /// Find a user by id.
    async fn find_user(&self, id: UserId) -> AppResult<Option<UserSummary>>;

    /// Persist the online flag and last-seen timestamp.
    async fn set_presence(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
}

/// Contact edges.
#[async_trait]
pub trait ContactStore: Send + Sync + Debug + 'static {
    /// The edge where `owner` keeps `contact` in their list.
    async fn find_contact(&self, owner: UserId, contact: UserId) -> AppResult<Option<Contact>>;

    /// Owners of every contact row pointing at `user` ("who has me as a contact").
    async fn watchers_of(&self, user: UserId) -> AppResult<Vec<UserId>>;
}

/// Conversations and their membership.
#[async_trait]
pub trait ChatStore: Send + Sync + Debug + 'static {
    /// Find a conversation by id.
    async fn find_chat(&self, id: ChatId) -> AppResult<Option<Chat>>;

    /// Current participant set. Never cached.
    async fn participants(&self, chat: ChatId) -> AppResult<Vec<UserId>>;

    /// Bump the conversation's `updated_at` ordering key.
    async fn touch(&self, chat: ChatId, at: DateTime<Utc>) -> AppResult<()>;
}

/// Message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync + Debug + 'static {
    /// Persist a message; storage assigns `id` and `created_at`.
    async fn create_message(&self, message: NewMessage) -> AppResult<Message>;

    /// Find a message by id.
    async fn find_message(&self, id: MessageId) -> AppResult<Option<Message>>;

    /// Set the read flag. Fails with `NotFound` for an unknown id.
    async fn mark_read(&self, id: MessageId) -> AppResult<Message>;
}

/// Call rows. Storage never validates transitions; it only enforces the
/// compare-and-set in [`CallStore::apply_transition`].
#[async_trait]
pub trait CallStore: Send + Sync + Debug + 'static {
    /// Create a call in the `RINGING` state.
    async fn create_call(&self, call: NewCall) -> AppResult<Call>;

    /// Find a call by id.
    async fn find_call(&self, id: CallId) -> AppResult<Option<Call>>;

    /// Write `transition` only if the stored status is one of `expected`.
    ///
    /// Returns the updated row, or `None` when the call is missing or its
    /// status did not match.
    async fn apply_transition(
        &self,
        id: CallId,
        expected: &[CallStatus],
        transition: CallTransition,
    ) -> AppResult<Option<Call>>;

    /// Calls where `user` is caller or receiver, newest first.
    async fn history(&self, user: UserId, limit: i64) -> AppResult<Vec<Call>>;

    /// Delete a call row. Returns whether a row was removed.
    async fn delete_call(&self, id: CallId) -> AppResult<bool>;

    /// Calls still `RINGING` that were created before `before`.
    async fn stale_ringing(&self, before: DateTime<Utc>) -> AppResult<Vec<Call>>;
}

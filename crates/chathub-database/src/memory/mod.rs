//! Process-local storage used by the `memory` provider and by tests.
//!
//! Every trait method takes the single state lock for the duration of one
//! logical operation, so a call transition's status check and write are
//! atomic just like the guarded `UPDATE` in the PostgreSQL repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, ChatId, ContactId, MessageId, UserId};
use chathub_entity::call::{Call, CallStatus, CallTransition, NewCall};
use chathub_entity::chat::Chat;
use chathub_entity::contact::Contact;
use chathub_entity::message::{Message, NewMessage};
use chathub_entity::user::UserSummary;

use crate::store::{CallStore, ChatStore, ContactStore, MessageStore, UserStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, UserSummary>,
    contacts: Vec<Contact>,
    chats: HashMap<ChatId, Chat>,
    participants: HashMap<ChatId, Vec<UserId>>,
    messages: HashMap<MessageId, Message>,
    calls: HashMap<CallId, Call>,
}

/// In-memory implementation of every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_message_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with the given display name.
    pub async fn seed_user(&self, name: &str) -> UserSummary {
        let user = UserSummary {
            id: UserId::new(),
            name: name.to_string(),
            username: name.to_lowercase(),
            avatar: None,
            is_online: false,
            last_seen: None,
        };
        self.state
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    /// Insert a directed contact edge `owner -> contact`.
    pub async fn seed_contact(&self, owner: UserId, contact: UserId, blocked: bool) -> Contact {
        let row = Contact {
            id: ContactId::new(),
            user_id: owner,
            contact_id: contact,
            nickname: None,
            is_blocked: blocked,
            created_at: Utc::now(),
        };
        let mut state = self.state.write().await;
        state
            .contacts
            .retain(|c| !(c.user_id == owner && c.contact_id == contact));
        state.contacts.push(row.clone());
        row
    }

    /// Insert a conversation with the given participants.
    pub async fn seed_chat(&self, participants: &[UserId]) -> Chat {
        let now = Utc::now();
        let chat = Chat {
            id: ChatId::new(),
            is_group: participants.len() > 2,
            group_name: None,
            created_by_id: participants.first().copied(),
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.write().await;
        state.chats.insert(chat.id, chat.clone());
        state.participants.insert(chat.id, participants.to_vec());
        chat
    }

    /// Replace a conversation's participant set.
    pub async fn set_participants(&self, chat: ChatId, participants: &[UserId]) {
        self.state
            .write()
            .await
            .participants
            .insert(chat, participants.to_vec());
    }

    /// Make every subsequent message write fail with a storage error.
    pub fn fail_message_writes(&self, fail: bool) {
        self.fail_message_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of persisted messages.
    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }

    /// Overwrite a call's creation time, e.g. to age it past the ring timeout.
    pub async fn backdate_call(&self, id: CallId, created_at: DateTime<Utc>) {
        if let Some(call) = self.state.write().await.calls.get_mut(&id) {
            call.created_at = created_at;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<UserSummary>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn set_presence(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.is_online = is_online;
            user.last_seen = last_seen;
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn find_contact(&self, owner: UserId, contact: UserId) -> AppResult<Option<Contact>> {
        Ok(self
            .state
            .read()
            .await
            .contacts
            .iter()
            .find(|c| c.user_id == owner && c.contact_id == contact)
            .cloned())
    }

    async fn watchers_of(&self, user: UserId) -> AppResult<Vec<UserId>> {
        Ok(self
            .state
            .read()
            .await
            .contacts
            .iter()
            .filter(|c| c.contact_id == user)
            .map(|c| c.user_id)
            .collect())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_chat(&self, id: ChatId) -> AppResult<Option<Chat>> {
        Ok(self.state.read().await.chats.get(&id).cloned())
    }

    async fn participants(&self, chat: ChatId) -> AppResult<Vec<UserId>> {
        Ok(self
            .state
            .read()
            .await
            .participants
            .get(&chat)
            .cloned()
            .unwrap_or_default())
    }

    async fn touch(&self, chat: ChatId, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(row) = self.state.write().await.chats.get_mut(&chat) {
            row.updated_at = at;
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_message(&self, message: NewMessage) -> AppResult<Message> {
        if self.fail_message_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage("Message write rejected by storage"));
        }
        let row = Message {
            id: MessageId::new(),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content,
            kind: message.kind,
            attachments: message.attachments,
            reply_to_id: message.reply_to_id,
            read: false,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .messages
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_message(&self, id: MessageId) -> AppResult<Option<Message>> {
        Ok(self.state.read().await.messages.get(&id).cloned())
    }

    async fn mark_read(&self, id: MessageId) -> AppResult<Message> {
        if self.fail_message_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage("Message write rejected by storage"));
        }
        let mut state = self.state.write().await;
        let row = state
            .messages
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Message {id} not found")))?;
        row.read = true;
        Ok(row.clone())
    }
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn create_call(&self, call: NewCall) -> AppResult<Call> {
        let row = Call {
            id: CallId::new(),
            caller_id: call.caller_id,
            receiver_id: call.receiver_id,
            call_type: call.call_type,
            status: CallStatus::Ringing,
            started_at: None,
            ended_at: None,
            duration: 0,
            created_at: Utc::now(),
        };
        self.state.write().await.calls.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_call(&self, id: CallId) -> AppResult<Option<Call>> {
        Ok(self.state.read().await.calls.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        id: CallId,
        expected: &[CallStatus],
        transition: CallTransition,
    ) -> AppResult<Option<Call>> {
        let mut state = self.state.write().await;
        match state.calls.get_mut(&id) {
            Some(call) if expected.contains(&call.status) => {
                call.apply(transition);
                Ok(Some(call.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn history(&self, user: UserId, limit: i64) -> AppResult<Vec<Call>> {
        let state = self.state.read().await;
        let mut calls: Vec<Call> = state
            .calls
            .values()
            .filter(|c| c.is_party(user))
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        calls.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(calls)
    }

    async fn delete_call(&self, id: CallId) -> AppResult<bool> {
        Ok(self.state.write().await.calls.remove(&id).is_some())
    }

    async fn stale_ringing(&self, before: DateTime<Utc>) -> AppResult<Vec<Call>> {
        let state = self.state.read().await;
        let mut calls: Vec<Call> = state
            .calls
            .values()
            .filter(|c| c.status == CallStatus::Ringing && c.created_at < before)
            .cloned()
            .collect();
        calls.sort_by_key(|c| c.created_at);
        Ok(calls)
    }
}

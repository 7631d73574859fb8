//! Message fan-out engine.
//!
//! A message is persisted first and broadcast second. If the write fails
//! nothing is sent. Once it succeeds every currently connected participant,
//! the sender included, receives exactly one `message:new`. Failures
//! after the write are logged and shrink the delivery count; the message
//! itself is still reported as sent.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{ChatId, MessageId, UserId};
use chathub_database::store::{ChatStore, MessageStore, UserStore};
use chathub_entity::message::{Message, MessageDetails, NewMessage, ReplyPreview};
use chathub_entity::user::UserProfile;

use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;
use crate::message::types::{OutboundEvent, SendMessagePayload};
use crate::message::validator::validate_send_message;

/// A persisted message and how many connections it reached.
#[derive(Debug, Clone)]
pub struct Delivery<T> {
    /// The persisted row.
    pub item: T,
    /// Participants whose connection accepted the event.
    pub delivered: usize,
}

/// Persists conversation events and pushes them to live participants.
#[derive(Debug, Clone)]
pub struct FanoutEngine {
    registry: Arc<ConnectionRegistry>,
    chats: Arc<dyn ChatStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserStore>,
}

impl FanoutEngine {
    /// Creates an engine over the registry and the chat, message and user
    /// stores.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        chats: Arc<dyn ChatStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            registry,
            chats,
            messages,
            users,
        }
    }

    /// Persists a message from `sender` and broadcasts it.
    pub async fn send_message(
        &self,
        sender: UserId,
        payload: SendMessagePayload,
    ) -> AppResult<Delivery<MessageDetails>> {
        validate_send_message(&payload)?;
        let chat_id = payload.conversation_id;
        self.require_participant(chat_id, sender).await?;

        let parent = match payload.reply_to_id {
            Some(reply_to) => match self.messages.find_message(reply_to).await? {
                Some(parent) if parent.chat_id == chat_id => Some(parent),
                _ => {
                    return Err(AppError::validation(
                        "replyToId must reference a message in the same conversation",
                    ));
                }
            },
            None => None,
        };

        let message = self
            .messages
            .create_message(NewMessage {
                chat_id,
                sender_id: sender,
                content: payload.content,
                kind: payload.kind,
                attachments: payload.attachments,
                reply_to_id: payload.reply_to_id,
            })
            .await?;

        if let Err(e) = self.chats.touch(chat_id, message.created_at).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to bump conversation ordering key");
        }

        let reply_to = match parent {
            Some(parent) => Some(ReplyPreview {
                sender: self.profile(parent.sender_id).await,
                message: parent,
            }),
            None => None,
        };
        let details = MessageDetails {
            sender: self.profile(sender).await,
            message,
            reply_to,
        };

        let participants = match self.chats.participants(chat_id).await {
            Ok(participants) => participants,
            Err(e) => {
                warn!(
                    chat_id = %chat_id,
                    message_id = %details.message.id,
                    error = %e,
                    "Message stored but participants could not be loaded, not broadcast"
                );
                Vec::new()
            }
        };
        let delivered = self.broadcast(&participants, builder::message_new(&details), None);

        info!(
            chat_id = %chat_id,
            message_id = %details.message.id,
            sender_id = %sender,
            participants = participants.len(),
            delivered,
            "Message fanned out"
        );
        Ok(Delivery {
            item: details,
            delivered,
        })
    }

    /// Public profile of `user`, or `None` when it cannot be loaded.
    async fn profile(&self, user: UserId) -> Option<UserProfile> {
        match self.users.find_user(user).await {
            Ok(found) => found.map(UserProfile::from),
            Err(e) => {
                warn!(user_id = %user, error = %e, "Failed to load user profile");
                None
            }
        }
    }

    /// Marks a message read and tells every live participant.
    pub async fn mark_read(
        &self,
        reader: UserId,
        message_id: MessageId,
    ) -> AppResult<Delivery<Message>> {
        let message = self
            .messages
            .find_message(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {message_id} not found")))?;
        let participants = self.chats.participants(message.chat_id).await?;
        if !participants.contains(&reader) {
            return Err(AppError::authorization(
                "Only conversation participants can mark messages read",
            ));
        }

        let message = self.messages.mark_read(message_id).await?;
        let event = builder::message_read(message.id, reader, message.chat_id);
        let delivered = self.broadcast(&participants, event, None);
        debug!(message_id = %message_id, reader_id = %reader, delivered, "Message marked read");
        Ok(Delivery {
            item: message,
            delivered,
        })
    }

    /// Relays a typing indicator to every other live participant.
    ///
    /// Non-participants are ignored and reach nobody.
    pub async fn typing(&self, user: UserId, chat_id: ChatId, started: bool) -> AppResult<usize> {
        let participants = self.chats.participants(chat_id).await?;
        if !participants.contains(&user) {
            debug!(user_id = %user, chat_id = %chat_id, "Typing from non-participant ignored");
            return Ok(0);
        }
        Ok(self.broadcast(
            &participants,
            builder::typing(started, user, chat_id),
            Some(user),
        ))
    }

    async fn require_participant(&self, chat_id: ChatId, user: UserId) -> AppResult<()> {
        if self.chats.find_chat(chat_id).await?.is_none() {
            return Err(AppError::not_found(format!("Conversation {chat_id} not found")));
        }
        if !self.chats.participants(chat_id).await?.contains(&user) {
            return Err(AppError::authorization(
                "Only conversation participants can send messages",
            ));
        }
        Ok(())
    }

    fn broadcast(
        &self,
        participants: &[UserId],
        event: OutboundEvent,
        skip: Option<UserId>,
    ) -> usize {
        participants
            .iter()
            .filter(|p| Some(**p) != skip)
            .filter(|p| self.registry.send(**p, event.clone()))
            .count()
    }
}

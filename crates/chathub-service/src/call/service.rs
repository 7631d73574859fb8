//! Call state machine: initiate, answer, reject, end, history and delete.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, UserId};
use chathub_database::store::{CallStore, ContactStore, UserStore};
use chathub_entity::call::{Call, CallDetails, CallTransition, CallType, NewCall};
use chathub_entity::user::UserProfile;
use chathub_realtime::ConnectionRegistry;
use chathub_realtime::message::builder::{self, CallEvent};

/// Most recent calls returned by [`CallService::history`].
pub const HISTORY_LIMIT: i64 = 100;

/// Drives call rows through their lifecycle and notifies the other party.
///
/// Every status change goes through [`CallStore::apply_transition`], so two
/// racing transitions on one call cannot both succeed.
#[derive(Debug, Clone)]
pub struct CallService {
    calls: Arc<dyn CallStore>,
    users: Arc<dyn UserStore>,
    contacts: Arc<dyn ContactStore>,
    registry: Arc<ConnectionRegistry>,
}

impl CallService {
    /// Creates a new call service.
    pub fn new(
        calls: Arc<dyn CallStore>,
        users: Arc<dyn UserStore>,
        contacts: Arc<dyn ContactStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            calls,
            users,
            contacts,
            registry,
        }
    }

    /// Places a call. The new row starts out `RINGING` and the receiver
    /// gets `call:incoming`.
    pub async fn initiate(
        &self,
        caller: UserId,
        receiver: UserId,
        call_type: CallType,
    ) -> AppResult<CallDetails> {
        if caller == receiver {
            return Err(AppError::validation("You cannot call yourself"));
        }
        if self.users.find_user(receiver).await?.is_none() {
            return Err(AppError::not_found(format!("User {receiver} not found")));
        }

        let outgoing = self.contacts.find_contact(caller, receiver).await?;
        if !outgoing.as_ref().is_some_and(|c| c.is_usable()) {
            return Err(AppError::authorization("You can only call your contacts"));
        }
        let incoming = self.contacts.find_contact(receiver, caller).await?;
        if !incoming.as_ref().is_some_and(|c| c.is_usable()) {
            return Err(AppError::authorization("Cannot call this user"));
        }

        let call = self
            .calls
            .create_call(NewCall {
                caller_id: caller,
                receiver_id: receiver,
                call_type,
            })
            .await?;

        info!(
            call_id = %call.id,
            caller_id = %caller,
            receiver_id = %receiver,
            call_type = call.call_type.as_str(),
            "Call initiated"
        );
        let call = with_parties(self.users.as_ref(), call).await;
        notify(&self.registry, receiver, CallEvent::Incoming, &call);
        Ok(call)
    }

    /// The receiver picks up a ringing call.
    pub async fn answer(&self, actor: UserId, id: CallId) -> AppResult<CallDetails> {
        let call = self.load(id).await?;
        if call.receiver_id != actor {
            return Err(AppError::authorization("Only the receiver can answer the call"));
        }
        let call = self
            .transition(id, CallTransition::Answer { at: Utc::now() })
            .await?;
        info!(call_id = %id, user_id = %actor, "Call answered");
        let call = with_parties(self.users.as_ref(), call).await;
        notify(&self.registry, call.call.caller_id, CallEvent::Answered, &call);
        Ok(call)
    }

    /// The receiver declines a ringing call.
    pub async fn reject(&self, actor: UserId, id: CallId) -> AppResult<CallDetails> {
        let call = self.load(id).await?;
        if call.receiver_id != actor {
            return Err(AppError::authorization("Only the receiver can reject the call"));
        }
        let call = self
            .transition(id, CallTransition::Reject { at: Utc::now() })
            .await?;
        info!(call_id = %id, user_id = %actor, "Call rejected");
        let call = with_parties(self.users.as_ref(), call).await;
        notify(&self.registry, call.call.caller_id, CallEvent::Rejected, &call);
        Ok(call)
    }

    /// Either party hangs up. `duration` defaults to zero seconds.
    pub async fn end(
        &self,
        actor: UserId,
        id: CallId,
        duration: Option<i32>,
    ) -> AppResult<CallDetails> {
        let duration = duration.unwrap_or(0);
        if duration < 0 {
            return Err(AppError::validation("Call duration cannot be negative"));
        }
        let call = self.load(id).await?;
        let Some(other) = call.counterpart(actor) else {
            return Err(AppError::authorization("You are not part of this call"));
        };
        let call = self
            .transition(
                id,
                CallTransition::End {
                    at: Utc::now(),
                    duration,
                },
            )
            .await?;
        info!(call_id = %id, user_id = %actor, duration, "Call ended");
        let call = with_parties(self.users.as_ref(), call).await;
        notify(&self.registry, other, CallEvent::Ended, &call);
        Ok(call)
    }

    /// The actor's most recent calls, newest first.
    pub async fn history(&self, actor: UserId) -> AppResult<Vec<CallDetails>> {
        let calls = self.calls.history(actor, HISTORY_LIMIT).await?;
        let mut profiles: HashMap<UserId, Option<UserProfile>> = HashMap::new();
        let mut details = Vec::with_capacity(calls.len());
        for call in calls {
            for party in [call.caller_id, call.receiver_id] {
                if !profiles.contains_key(&party) {
                    let found = profile(self.users.as_ref(), party).await;
                    profiles.insert(party, found);
                }
            }
            details.push(CallDetails {
                caller: profiles.get(&call.caller_id).cloned().flatten(),
                receiver: profiles.get(&call.receiver_id).cloned().flatten(),
                call,
            });
        }
        Ok(details)
    }

    /// Removes a call from the log. Only its caller or receiver may do so.
    pub async fn delete(&self, actor: UserId, id: CallId) -> AppResult<()> {
        let call = self.load(id).await?;
        if !call.is_party(actor) {
            return Err(AppError::authorization(
                "You can only delete your own call logs",
            ));
        }
        if !self.calls.delete_call(id).await? {
            return Err(not_found(id));
        }
        info!(call_id = %id, user_id = %actor, "Call log deleted");
        Ok(())
    }

    async fn load(&self, id: CallId) -> AppResult<Call> {
        self.calls.find_call(id).await?.ok_or_else(|| not_found(id))
    }

    /// Compare-and-set against the statuses `transition` may start from.
    /// A losing attempt re-reads the row to report why it lost.
    async fn transition(&self, id: CallId, transition: CallTransition) -> AppResult<Call> {
        if let Some(call) = self
            .calls
            .apply_transition(id, transition.allowed_from(), transition)
            .await?
        {
            return Ok(call);
        }
        match self.calls.find_call(id).await? {
            Some(current) => Err(AppError::invalid_transition(format!(
                "Cannot {} a call that is {}",
                transition.verb(),
                current.status.as_str()
            ))),
            None => Err(not_found(id)),
        }
    }
}

fn not_found(id: CallId) -> AppError {
    AppError::not_found(format!("Call {id} not found"))
}

/// Public profile of `user`. A failed lookup is logged and yields `None`,
/// since the call row has already been written by then.
async fn profile(users: &dyn UserStore, user: UserId) -> Option<UserProfile> {
    match users.find_user(user).await {
        Ok(found) => found.map(UserProfile::from),
        Err(e) => {
            warn!(user_id = %user, error = %e, "Failed to load call party profile");
            None
        }
    }
}

/// Attaches both parties' profiles to a call.
pub(crate) async fn with_parties(users: &dyn UserStore, call: Call) -> CallDetails {
    let caller = profile(users, call.caller_id).await;
    let receiver = profile(users, call.receiver_id).await;
    CallDetails {
        call,
        caller,
        receiver,
    }
}

/// Pushes a call event to one party; a miss is logged and otherwise ignored.
pub(crate) fn notify(
    registry: &ConnectionRegistry,
    target: UserId,
    event: CallEvent,
    call: &CallDetails,
) {
    if !registry.send(target, builder::call(event, call)) {
        warn!(
            call_id = %call.call.id,
            target_id = %target,
            event = event.event_name(),
            "Call notification not delivered"
        );
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use chathub_core::ErrorKind;
    use chathub_database::MemoryStore;
    use chathub_entity::call::CallStatus;
    use chathub_realtime::metrics::RealtimeMetrics;
    use chathub_realtime::{ConnectionHandle, OutboundEvent};

    use super::*;

    struct Fixture {
        mem: Arc<MemoryStore>,
        registry: Arc<ConnectionRegistry>,
        service: CallService,
        alice: UserId,
        bob: UserId,
    }

    async fn fixture() -> Fixture {
        let mem = Arc::new(MemoryStore::new());
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(RealtimeMetrics::new())));
        let service = CallService::new(mem.clone(), mem.clone(), mem.clone(), registry.clone());
        let alice = mem.seed_user("alice").await.id;
        let bob = mem.seed_user("bob").await.id;
        mem.seed_contact(alice, bob, false).await;
        mem.seed_contact(bob, alice, false).await;
        Fixture {
            mem,
            registry,
            service,
            alice,
            bob,
        }
    }

    fn connect(registry: &ConnectionRegistry, user: UserId) -> mpsc::Receiver<OutboundEvent> {
        let (handle, rx) = ConnectionHandle::new(user, None, 16);
        registry.register(Arc::new(handle));
        rx
    }

    #[tokio::test]
    async fn test_video_call_happy_path() {
        let fx = fixture().await;
        let mut alice_rx = connect(&fx.registry, fx.alice);
        let mut bob_rx = connect(&fx.registry, fx.bob);

        let call = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Video)
            .await
            .unwrap();
        assert_eq!(call.caller.as_ref().map(|p| p.username.as_str()), Some("alice"));
        assert_eq!(call.receiver.as_ref().map(|p| p.id), Some(fx.bob));
        let call = call.call;
        assert_eq!(call.status, CallStatus::Ringing);
        let incoming = bob_rx.try_recv().unwrap();
        assert_eq!(incoming.event, "call:incoming");
        assert_eq!(incoming.data["call"]["id"], call.id.to_string());
        assert_eq!(incoming.data["call"]["caller"]["name"], "alice");
        assert_eq!(incoming.data["call"]["receiver"]["username"], "bob");

        let answered = fx.service.answer(fx.bob, call.id).await.unwrap().call;
        assert_eq!(answered.status, CallStatus::Answered);
        assert!(answered.started_at.is_some());
        assert_eq!(alice_rx.try_recv().unwrap().event, "call:answered");

        let ended = fx.service.end(fx.alice, call.id, Some(42)).await.unwrap().call;
        assert_eq!(ended.status, CallStatus::Ended);
        assert_eq!(ended.duration, 42);
        assert!(ended.ended_at.is_some());
        assert_eq!(bob_rx.try_recv().unwrap().event, "call:ended");
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_initiate_requires_mutual_unblocked_contacts() {
        let fx = fixture().await;
        let carol = fx.mem.seed_user("carol").await.id;

        let err = fx
            .service
            .initiate(fx.alice, carol, CallType::Voice)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        fx.mem.seed_contact(fx.bob, fx.alice, true).await;
        let err = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Voice)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert!(fx.service.history(fx.alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_initiate_validates_receiver() {
        let fx = fixture().await;
        let err = fx
            .service
            .initiate(fx.alice, fx.alice, CallType::Voice)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = fx
            .service
            .initiate(fx.alice, UserId::new(), CallType::Voice)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_only_receiver_may_answer_or_reject() {
        let fx = fixture().await;
        let call = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Voice)
            .await
            .unwrap()
            .call;

        let err = fx.service.answer(fx.alice, call.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        let err = fx.service.reject(fx.alice, call.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let stored = fx.mem.find_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CallStatus::Ringing);
    }

    #[tokio::test]
    async fn test_terminal_call_rejects_further_transitions() {
        let fx = fixture().await;
        let call = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Voice)
            .await
            .unwrap()
            .call;
        let rejected = fx.service.reject(fx.bob, call.id).await.unwrap().call;
        assert_eq!(rejected.status, CallStatus::Rejected);

        let err = fx.service.end(fx.alice, call.id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
        let err = fx.service.reject(fx.bob, call.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
        let err = fx.service.answer(fx.bob, call.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);

        let stored = fx.mem.find_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored, rejected);
    }

    #[tokio::test]
    async fn test_racing_answer_and_reject_exactly_one_wins() {
        let fx = fixture().await;
        let call = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Voice)
            .await
            .unwrap()
            .call;

        let (a, b) = tokio::join!(
            fx.service.answer(fx.bob, call.id),
            fx.service.reject(fx.bob, call.id)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = a.err().or(b.err()).unwrap();
        assert_eq!(loser.kind, ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_end_validation_and_party_check() {
        let fx = fixture().await;
        let call = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Voice)
            .await
            .unwrap()
            .call;

        let err = fx.service.end(fx.alice, call.id, Some(-1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        let err = fx.service.end(UserId::new(), call.id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let ended = fx.service.end(fx.bob, call.id, None).await.unwrap().call;
        assert_eq!(ended.duration, 0);
    }

    #[tokio::test]
    async fn test_delete_is_party_only() {
        let fx = fixture().await;
        let call = fx
            .service
            .initiate(fx.alice, fx.bob, CallType::Voice)
            .await
            .unwrap()
            .call;

        let err = fx.service.delete(UserId::new(), call.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let history = fx.service.history(fx.alice).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].call.id, call.id);
        assert_eq!(history[0].receiver.as_ref().map(|p| p.id), Some(fx.bob));

        fx.service.delete(fx.bob, call.id).await.unwrap();
        assert!(fx.service.history(fx.alice).await.unwrap().is_empty());
        let err = fx.service.delete(fx.bob, call.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}

//! Integration tests for the call lifecycle over HTTP with WebSocket
//! notifications.

mod helpers;

use serde_json::json;

use helpers::TestServer;

#[tokio::test]
async fn test_video_call_lifecycle_notifies_both_parties() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    server.befriend(alice, bob).await;
    let alice_token = server.token(alice);
    let bob_token = server.token(bob);

    let mut bob_ws = server.ws(bob).await;
    let mut alice_ws = server.ws(alice).await;
    bob_ws.expect("presence:online").await;

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&alice_token),
            Some(json!({ "receiverId": bob, "type": "VIDEO" })),
        )
        .await;
    assert_eq!(response.status, 201, "{:?}", response.body);
    let call = &response.body["data"];
    assert_eq!(call["status"], "RINGING");
    assert_eq!(call["type"], "VIDEO");
    assert_eq!(call["caller"]["username"], "alice");
    assert_eq!(call["receiver"]["id"], json!(bob));
    let call_id = call["id"].as_str().unwrap().to_string();

    let incoming = bob_ws.expect("call:incoming").await;
    assert_eq!(incoming["data"]["call"]["id"], call_id.as_str());
    assert_eq!(incoming["data"]["call"]["callerId"], json!(alice));
    assert_eq!(incoming["data"]["call"]["caller"]["name"], "Alice");

    let response = server
        .post(&format!("/api/calls/{call_id}/answer"), Some(&bob_token), None)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["data"]["status"], "ANSWERED");
    assert!(response.body["data"]["startedAt"].is_string());
    let answered = alice_ws.expect("call:answered").await;
    assert_eq!(answered["data"]["call"]["status"], "ANSWERED");

    let response = server
        .post(
            &format!("/api/calls/{call_id}/end"),
            Some(&alice_token),
            Some(json!({ "duration": 42 })),
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["data"]["status"], "ENDED");
    assert_eq!(response.body["data"]["duration"], 42);
    let ended = bob_ws.expect("call:ended").await;
    assert_eq!(ended["data"]["call"]["duration"], 42);

    // The initiator is not notified of its own transitions.
    alice_ws.expect_quiet().await;

    server.stop().await;
}

#[tokio::test]
async fn test_terminal_call_rejects_further_transitions() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    server.befriend(alice, bob).await;
    let alice_token = server.token(alice);
    let bob_token = server.token(bob);

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&alice_token),
            Some(json!({ "receiverId": bob, "type": "VOICE" })),
        )
        .await;
    let call_id = response.body["data"]["id"].as_str().unwrap().to_string();

    let response = server
        .post(&format!("/api/calls/{call_id}/reject"), Some(&bob_token), None)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["data"]["status"], "REJECTED");

    let response = server
        .post(&format!("/api/calls/{call_id}/answer"), Some(&bob_token), None)
        .await;
    assert_eq!(response.status, 409);
    assert_eq!(response.body["error"], "INVALID_TRANSITION");

    let response = server
        .post(&format!("/api/calls/{call_id}/end"), Some(&alice_token), None)
        .await;
    assert_eq!(response.status, 409);

    server.stop().await;
}

#[tokio::test]
async fn test_only_receiver_answers_and_strangers_are_refused() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    let mallory = server.user("Mallory").await;
    server.befriend(alice, bob).await;
    let alice_token = server.token(alice);

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&alice_token),
            Some(json!({ "receiverId": bob, "type": "VOICE" })),
        )
        .await;
    let call_id = response.body["data"]["id"].as_str().unwrap().to_string();

    let response = server
        .post(&format!("/api/calls/{call_id}/answer"), Some(&alice_token), None)
        .await;
    assert_eq!(response.status, 403);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "AUTHORIZATION");

    let mallory_token = server.token(mallory);
    let response = server
        .post(&format!("/api/calls/{call_id}/end"), Some(&mallory_token), None)
        .await;
    assert_eq!(response.status, 403);

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&mallory_token),
            Some(json!({ "receiverId": alice, "type": "VOICE" })),
        )
        .await;
    assert_eq!(response.status, 403, "non-contacts cannot call");

    server.stop().await;
}

#[tokio::test]
async fn test_initiate_validation_and_authentication() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let token = server.token(alice);

    let response = server
        .post(
            "/api/calls/initiate",
            None,
            Some(json!({ "receiverId": alice, "type": "VOICE" })),
        )
        .await;
    assert_eq!(response.status, 401);

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&token),
            Some(json!({ "receiverId": alice, "type": "VOICE" })),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"], "VALIDATION");

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&token),
            Some(json!({ "receiverId": uuid_string(), "type": "VOICE" })),
        )
        .await;
    assert_eq!(response.status, 404);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_requests_get_json_error_bodies() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let token = server.token(alice);

    // Unknown call type.
    let response = server
        .post(
            "/api/calls/initiate",
            Some(&token),
            Some(json!({ "receiverId": uuid_string(), "type": "HOLOGRAM" })),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "VALIDATION");
    assert!(response.body["message"].is_string());

    // No body, so no JSON content type.
    let response = server.post("/api/calls/initiate", Some(&token), None).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"], "VALIDATION");

    let response = server
        .post("/api/calls/not-a-uuid/answer", Some(&token), None)
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "VALIDATION");

    server.stop().await;
}

#[tokio::test]
async fn test_end_rejects_negative_duration() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    server.befriend(alice, bob).await;
    let alice_token = server.token(alice);

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&alice_token),
            Some(json!({ "receiverId": bob, "type": "VOICE" })),
        )
        .await;
    let call_id = response.body["data"]["id"].as_str().unwrap().to_string();

    let response = server
        .post(
            &format!("/api/calls/{call_id}/end"),
            Some(&alice_token),
            Some(json!({ "duration": -5 })),
        )
        .await;
    assert_eq!(response.status, 400);

    // Ending a ringing call without a body records zero talk time.
    let response = server
        .post(&format!("/api/calls/{call_id}/end"), Some(&alice_token), None)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["data"]["duration"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_history_and_delete() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    let carol = server.user("Carol").await;
    server.befriend(alice, bob).await;
    let alice_token = server.token(alice);
    let bob_token = server.token(bob);
    let carol_token = server.token(carol);

    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = server
            .post(
                "/api/calls/initiate",
                Some(&alice_token),
                Some(json!({ "receiverId": bob, "type": "VOICE" })),
            )
            .await;
        ids.push(response.body["data"]["id"].as_str().unwrap().to_string());
    }

    let response = server.get("/api/calls/history", Some(&bob_token)).await;
    assert_eq!(response.status, 200);
    let history = response.body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"], ids[1].as_str(), "newest first");

    let response = server.get("/api/calls/history", Some(&carol_token)).await;
    assert_eq!(response.body["data"], json!([]));

    let response = server
        .delete(&format!("/api/calls/{}", ids[0]), Some(&carol_token))
        .await;
    assert_eq!(response.status, 403);

    let response = server
        .delete(&format!("/api/calls/{}", ids[0]), Some(&bob_token))
        .await;
    assert_eq!(response.status, 200);
    assert!(response.body["data"]["message"].is_string());

    let response = server
        .delete(&format!("/api/calls/{}", ids[0]), Some(&alice_token))
        .await;
    assert_eq!(response.status, 404);

    let response = server.get("/api/calls/history", Some(&alice_token)).await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_ringing_call_times_out_to_missed() {
    let server = TestServer::start_with(|config| {
        config.realtime.ring_timeout_seconds = 1;
        config.realtime.watchdog_interval_seconds = 1;
    })
    .await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    server.befriend(alice, bob).await;
    let alice_token = server.token(alice);

    let mut alice_ws = server.ws(alice).await;
    let response = server
        .post(
            "/api/calls/initiate",
            Some(&alice_token),
            Some(json!({ "receiverId": bob, "type": "VOICE" })),
        )
        .await;
    let call_id = response.body["data"]["id"].as_str().unwrap().to_string();

    let missed = alice_ws.expect("call:missed").await;
    assert_eq!(missed["data"]["call"]["id"], call_id.as_str());
    assert_eq!(missed["data"]["call"]["status"], "MISSED");

    server.stop().await;
}

fn uuid_string() -> String {
    chathub_core::types::UserId::new().to_string()
}

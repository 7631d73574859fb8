//! Integration tests for WebSocket connection, presence, fan-out and
//! signaling.

mod helpers;

use serde_json::json;

use helpers::TestServer;

#[tokio::test]
async fn test_bad_token_gets_error_event_then_close() {
    let server = TestServer::start().await;

    let mut ws = server.ws_raw("?token=not-a-jwt").await;
    let event = ws.next_event().await;
    assert_eq!(event["event"], "error");
    assert_eq!(event["data"]["code"], "AUTHENTICATION");
    ws.expect_closed().await;

    let mut ws = server.ws_raw("").await;
    assert_eq!(ws.expect("error").await["data"]["code"], "AUTHENTICATION");
    ws.expect_closed().await;

    assert_eq!(server.state.realtime.registry.connection_count(), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_token_for_deleted_user_is_refused() {
    let server = TestServer::start().await;
    let ghost = chathub_core::types::UserId::new();

    let mut ws = server
        .ws_raw(&format!("?token={}", server.token(ghost)))
        .await;
    assert_eq!(ws.expect("error").await["data"]["code"], "AUTHENTICATION");
    ws.expect_closed().await;

    server.stop().await;
}

#[tokio::test]
async fn test_ping_pong() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;

    let mut ws = server.ws(alice).await;
    ws.emit("ping", json!({}), None).await;
    let pong = ws.expect("pong").await;
    assert!(pong["data"]["timestamp"].is_i64());

    server.stop().await;
}

#[tokio::test]
async fn test_message_reaches_each_live_participant_once() {
    let server = TestServer::start().await;
    let a = server.user("Alice").await;
    let b = server.user("Bob").await;
    let c = server.user("Carol").await;
    let chat = server.chat(&[a, b, c]).await;

    let mut a_ws = server.ws(a).await;
    let mut c_ws = server.ws(c).await;

    a_ws.emit(
        "message:send",
        json!({ "conversationId": chat, "content": "hello" }),
        Some("req-1"),
    )
    .await;

    let own = a_ws.expect("message:new").await;
    assert_eq!(own["data"]["content"], "hello");
    assert_eq!(own["data"]["senderId"], json!(a));
    assert_eq!(own["data"]["conversationId"], json!(chat));
    assert_eq!(own["data"]["sender"]["name"], "Alice");
    let ack = a_ws.expect("ack").await;
    assert_eq!(ack["data"]["requestId"], "req-1");
    assert_eq!(ack["data"]["success"], true);
    assert_eq!(ack["data"]["data"]["id"], own["data"]["id"]);

    let received = c_ws.expect("message:new").await;
    assert_eq!(received["data"]["id"], own["data"]["id"]);

    a_ws.expect_quiet().await;
    c_ws.expect_quiet().await;
    assert_eq!(server.mem.message_count().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_non_participant_send_is_refused_and_not_stored() {
    let server = TestServer::start().await;
    let a = server.user("Alice").await;
    let b = server.user("Bob").await;
    let outsider = server.user("Oscar").await;
    let chat = server.chat(&[a, b]).await;

    let mut a_ws = server.ws(a).await;
    let mut o_ws = server.ws(outsider).await;

    o_ws.emit(
        "message:send",
        json!({ "conversationId": chat, "content": "let me in" }),
        Some("req-9"),
    )
    .await;
    let ack = o_ws.expect("ack").await;
    assert_eq!(ack["data"]["success"], false);
    assert_eq!(ack["data"]["error"]["code"], "AUTHORIZATION");

    a_ws.expect_quiet().await;
    assert_eq!(server.mem.message_count().await, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_typing_and_read_receipts() {
    let server = TestServer::start().await;
    let a = server.user("Alice").await;
    let b = server.user("Bob").await;
    let chat = server.chat(&[a, b]).await;

    let mut a_ws = server.ws(a).await;
    let mut b_ws = server.ws(b).await;

    a_ws.emit("typing:start", json!({ "conversationId": chat }), None)
        .await;
    let typing = b_ws.expect("typing:start").await;
    assert_eq!(typing["data"]["userId"], json!(a));
    // Typing is not echoed to the typist.
    a_ws.expect_quiet().await;

    a_ws.emit(
        "message:send",
        json!({ "conversationId": chat, "content": "hi" }),
        None,
    )
    .await;
    let message = b_ws.expect("message:new").await;
    a_ws.expect("message:new").await;
    let message_id = message["data"]["id"].clone();

    b_ws.emit("message:read", json!({ "messageId": message_id }), Some("r"))
        .await;
    let read = a_ws.expect("message:read").await;
    assert_eq!(read["data"]["messageId"], message_id);
    assert_eq!(read["data"]["readerId"], json!(b));
    b_ws.expect("message:read").await;
    let ack = b_ws.expect("ack").await;
    assert_eq!(ack["data"]["success"], true);

    server.stop().await;
}

#[tokio::test]
async fn test_presence_follows_connect_and_disconnect() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    // Bob watches Alice.
    server.mem.seed_contact(bob, alice, false).await;

    let mut bob_ws = server.ws(bob).await;

    let alice_ws = server.ws(alice).await;
    let online = bob_ws.expect("presence:online").await;
    assert_eq!(online["data"]["userId"], json!(alice));
    assert_eq!(online["data"]["isOnline"], true);

    alice_ws.close().await;
    let offline = bob_ws.expect("presence:offline").await;
    assert_eq!(offline["data"]["userId"], json!(alice));
    assert!(offline["data"]["lastSeenAt"].is_string());

    let _alice_ws = server.ws(alice).await;
    bob_ws.expect("presence:online").await;
    bob_ws.expect_quiet().await;

    server.stop().await;
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    server.mem.seed_contact(bob, alice, false).await;

    let mut bob_ws = server.ws(bob).await;
    let mut first = server.ws(alice).await;
    bob_ws.expect("presence:online").await;

    let mut second = server.ws(alice).await;
    first.expect("session:replaced").await;
    first.expect_closed().await;

    // Alice never went offline, so watchers hear nothing.
    bob_ws.expect_quiet().await;
    assert_eq!(server.state.realtime.registry.connection_count(), 2);

    second.emit("ping", json!({}), None).await;
    second.expect("pong").await;

    server.stop().await;
}

#[tokio::test]
async fn test_signals_relay_between_call_parties_only() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let bob = server.user("Bob").await;
    let eve = server.user("Eve").await;
    server.befriend(alice, bob).await;

    let response = server
        .post(
            "/api/calls/initiate",
            Some(&server.token(alice)),
            Some(json!({ "receiverId": bob, "type": "VIDEO" })),
        )
        .await;
    let call_id = response.body["data"]["id"].clone();

    let mut alice_ws = server.ws(alice).await;
    let mut bob_ws = server.ws(bob).await;
    let mut eve_ws = server.ws(eve).await;
    alice_ws.expect("presence:online").await;

    alice_ws
        .emit(
            "webrtc:offer",
            json!({
                "callId": call_id,
                "to": bob,
                "from": eve,
                "signal": { "type": "offer", "sdp": "v=0" },
            }),
            None,
        )
        .await;
    let offer = bob_ws.expect("webrtc:offer").await;
    assert_eq!(offer["data"]["from"], json!(alice));
    assert_eq!(offer["data"]["signal"]["sdp"], "v=0");

    eve_ws
        .emit(
            "webrtc:ice",
            json!({ "callId": call_id, "to": bob, "signal": { "candidate": "c" } }),
            Some("ice-1"),
        )
        .await;
    let ack = eve_ws.expect("ack").await;
    assert_eq!(ack["data"]["success"], false);
    assert_eq!(ack["data"]["error"]["code"], "AUTHORIZATION");
    bob_ws.expect_quiet().await;

    assert!(server.state.realtime.metrics.snapshot().signals_dropped >= 1);
    server.stop().await;
}

#[tokio::test]
async fn test_detailed_health_counts_connections() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let _ws = server.ws(alice).await;

    let response = server.get("/api/health/detailed", None).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["storage"], "connected");
    assert_eq!(response.body["data"]["wsConnections"], 1);
    assert_eq!(response.body["data"]["onlineUsers"], 1);

    let response = server.get("/api/health", None).await;
    assert_eq!(response.status, 200);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_marks_connected_users_offline() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;
    let mut ws = server.ws(alice).await;
    let mem = server.mem.clone();

    server.stop().await;
    ws.expect_closed().await;

    use chathub_database::UserStore;
    let user = mem.find_user(alice).await.unwrap().unwrap();
    assert!(!user.is_online);
    assert!(user.last_seen.is_some());
}

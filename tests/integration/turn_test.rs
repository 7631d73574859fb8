//! Integration tests for the TURN credential endpoint.

mod helpers;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::TestServer;

#[tokio::test]
async fn test_credentials_require_authentication() {
    let server = TestServer::start().await;

    let response = server.get("/api/turn/credentials", None).await;
    assert_eq!(response.status, 401);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "AUTHENTICATION");

    server.stop().await;
}

#[tokio::test]
async fn test_unconfigured_provider_serves_stun_fallback() {
    let server = TestServer::start().await;
    let alice = server.user("Alice").await;

    let response = server
        .get("/api/turn/credentials", Some(&server.token(alice)))
        .await;
    assert_eq!(response.status, 200);
    let data = &response.body["data"];
    assert_eq!(data["provider"], "fallback-stun-only");
    assert_eq!(data["ttl"], 3600);
    let servers = data["iceServers"].as_array().unwrap();
    assert_eq!(servers.len(), 3);
    assert!(servers.iter().all(|s| s["urls"].as_str().unwrap().starts_with("stun:")));

    server.stop().await;
}

#[tokio::test]
async fn test_provider_credentials_are_passed_through() {
    let provider = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/_turn/chathub-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "s": "ok",
            "v": {
                "iceServers": [{
                    "urls": ["turn:relay.example.com:3478?transport=udp", "turns:relay.example.com:443"],
                    "username": "ephemeral-user",
                    "credential": "ephemeral-pass"
                }]
            }
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let uri = provider.uri();
    let server = TestServer::start_with(move |config| {
        config.turn.base_url = uri;
        config.turn.secret = "provider-secret".to_string();
        config.turn.channel = "chathub-test".to_string();
    })
    .await;
    let alice = server.user("Alice").await;
    let token = server.token(alice);

    for _ in 0..2 {
        let response = server.get("/api/turn/credentials", Some(&token)).await;
        assert_eq!(response.status, 200);
        let data = &response.body["data"];
        assert_eq!(data["provider"], "xirsys");
        assert_eq!(data["ttl"], 86400);
        assert_eq!(data["iceServers"][0]["username"], "ephemeral-user");
        assert_eq!(data["iceServers"][0]["urls"][1], "turns:relay.example.com:443");
    }

    server.stop().await;
}

//! Integration tests for the WebSocket subscription endpoints.

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::{TestServer, TestWebSocket, WsMessage};
use postfeed_server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

struct TestContext {
    server: TestServer,
    state: AppState,
}

impl TestContext {
    fn new() -> Self {
        let state = AppState::new(ServerConfig::new());
        let server = TestServer::builder()
            .http_transport()
            .build(create_router(state.clone()))
            .unwrap();
        Self { server, state }
    }

    async fn connect(&self, path: &str) -> TestWebSocket {
        self.server
            .get_websocket(path)
            .await
            .into_websocket()
            .await
    }

    async fn wait_for_subscriptions(&self, expected: usize) {
        for _ in 0..200 {
            if self.state.registry.subscription_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {expected} subscriptions, found {}",
            self.state.registry.subscription_count()
        );
    }
}

async fn next_frame(socket: &mut TestWebSocket) -> Value {
    tokio::time::timeout(RECEIVE_TIMEOUT, socket.receive_json::<Value>())
        .await
        .expect("no frame received")
}

#[tokio::test]
async fn test_post_subscription_receives_frames() {
    let ctx = TestContext::new();
    let mut socket = ctx.connect("/subscriptions/post").await;
    assert_eq!(ctx.state.registry.subscription_count(), 1);

    ctx.server
        .patch("/posts/12")
        .json(&json!({ "published": true }))
        .await
        .assert_status_ok();

    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["topic"], "post");
    assert_eq!(frame["mutation"], "CREATED");
    assert_eq!(frame["data"]["id"], "12");
    assert_eq!(frame["data"]["published"], true);

    ctx.server.delete("/posts/12").await.assert_status_ok();

    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["mutation"], "DELETED");
    assert_eq!(frame["data"]["title"], "Programming Music");
}

#[tokio::test]
async fn test_scoped_comment_subscription() {
    let ctx = TestContext::new();
    let mut socket = ctx
        .server
        .get_websocket("/subscriptions/comment")
        .add_query_param("post_id", "11")
        .await
        .into_websocket()
        .await;

    for post in ["14", "11"] {
        ctx.server
            .post("/comments")
            .json(&json!({ "text": "hello", "author": "1", "post": post }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["topic"], "comment:11");
    assert_eq!(frame["mutation"], "CREATED");
    assert_eq!(frame["data"]["post"], "11");
}

#[tokio::test]
async fn test_client_disconnect_cancels_subscription() {
    let ctx = TestContext::new();
    let socket = ctx.connect("/subscriptions/user").await;
    assert_eq!(ctx.state.registry.subscription_count(), 1);

    socket.close().await;
    ctx.wait_for_subscriptions(0).await;
    assert_eq!(ctx.state.metrics().subscriptions_closed(), 1);
}

#[tokio::test]
async fn test_unpublished_post_subscription_not_found() {
    let ctx = TestContext::new();

    ctx.server
        .get_websocket("/subscriptions/comment")
        .add_query_param("post_id", "12")
        .expect_failure()
        .await
        .assert_status_not_found();

    ctx.server
        .get_websocket("/subscriptions/comment")
        .add_query_param("post_id", "")
        .expect_failure()
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(ctx.state.registry.subscription_count(), 0);
}

#[tokio::test]
async fn test_subscribe_after_shutdown_unavailable() {
    let ctx = TestContext::new();
    ctx.state.registry.shutdown();

    let response = ctx
        .server
        .get_websocket("/subscriptions/user")
        .expect_failure()
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn test_shutdown_closes_socket() {
    let ctx = TestContext::new();
    let mut socket = ctx.connect("/subscriptions/post").await;

    ctx.state.registry.shutdown();

    let message = tokio::time::timeout(RECEIVE_TIMEOUT, socket.receive_message())
        .await
        .expect("socket was not closed");
    assert!(matches!(message, WsMessage::Close(_)));
}

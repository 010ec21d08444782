//! Integration tests for the HTTP API and its change notifications.

use axum::http::StatusCode;
use axum_test::TestServer;
use postfeed_core::MutationKind;
use postfeed_proto::topic::{COMMENT, POST, USER};
use postfeed_proto::{Comment, Post, Topic, User};
use postfeed_server::routes::health::HealthResponse;
use postfeed_server::{create_router, AppState, ServerConfig};
use serde_json::json;

struct TestContext {
    server: TestServer,
    state: AppState,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(ServerConfig::new())
    }

    fn with_config(config: ServerConfig) -> Self {
        let state = AppState::new(config);
        let server = TestServer::new(create_router(state.clone())).unwrap();
        Self { server, state }
    }
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let _sub = ctx.state.registry.subscribe(Topic::new(POST)).unwrap();

    let response = ctx.server.get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.subscriptions, 1);
}

#[tokio::test]
async fn test_list_and_filter_users() {
    let ctx = TestContext::new();

    let all: Vec<User> = ctx.server.get("/users").await.json();
    assert_eq!(all.len(), 4);

    let filtered: Vec<User> = ctx
        .server
        .get("/users")
        .add_query_param("query", "sar")
        .await
        .json();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "Sarah");
}

#[tokio::test]
async fn test_create_user_and_conflict() {
    let ctx = TestContext::new();
    let mut users = ctx.state.registry.subscribe(Topic::new(USER)).unwrap();

    let response = ctx
        .server
        .post("/users")
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "age": 36 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user: User = response.json();
    assert_eq!(user.age, Some(36));

    let event = users.recv().await.unwrap();
    assert_eq!(event.kind(), MutationKind::Created);
    assert_eq!(event.payload().id(), user.id);

    let response = ctx
        .server
        .post("/users")
        .json(&json!({ "name": "Ada again", "email": "ada@example.com" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_patch_missing_user_is_not_found() {
    let ctx = TestContext::new();

    ctx.server
        .patch("/users/99")
        .json(&json!({ "email": "sarah@example.com" }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_post_visibility_notifications() {
    let ctx = TestContext::new();
    let mut posts = ctx.state.registry.subscribe(Topic::new(POST)).unwrap();

    // Draft: stored but not announced.
    let response = ctx
        .server
        .post("/posts")
        .json(&json!({ "title": "Draft", "body": "", "published": false, "author": "2" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let draft: Post = response.json();
    assert!(posts.try_recv().is_none());

    // Publishing it announces CREATED.
    ctx.server
        .patch(&format!("/posts/{}", draft.id))
        .json(&json!({ "published": true }))
        .await
        .assert_status_ok();
    let event = posts.recv().await.unwrap();
    assert_eq!(event.kind(), MutationKind::Created);

    // Title edit while published announces UPDATED.
    ctx.server
        .patch(&format!("/posts/{}", draft.id))
        .json(&json!({ "title": "Final" }))
        .await
        .assert_status_ok();
    let event = posts.recv().await.unwrap();
    assert_eq!(event.kind(), MutationKind::Updated);
    assert_eq!(event.payload().as_post().unwrap().title, "Final");

    // Deleting announces DELETED with the last visible state.
    ctx.server
        .delete(&format!("/posts/{}", draft.id))
        .await
        .assert_status_ok();
    let event = posts.recv().await.unwrap();
    assert_eq!(event.kind(), MutationKind::Deleted);
    assert_eq!(event.payload().as_post().unwrap().title, "Final");

    ctx.server
        .get(&format!("/posts/{}", draft.id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_comment_flow() {
    let ctx = TestContext::new();
    let mut flat = ctx.state.registry.subscribe(Topic::new(COMMENT)).unwrap();
    let mut scoped = ctx
        .state
        .registry
        .subscribe(Topic::scoped(COMMENT, "11"))
        .unwrap();

    for text in ["first", "second"] {
        ctx.server
            .post("/comments")
            .json(&json!({ "text": text, "author": "2", "post": "11" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let texts: Vec<String> = [flat.recv().await.unwrap(), flat.recv().await.unwrap()]
        .into_iter()
        .map(|event| event.payload().as_comment().unwrap().text.clone())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(scoped.recv().await.unwrap().topic().as_str(), "comment:11");

    let on_post: Vec<Comment> = ctx.server.get("/posts/11/comments").await.json();
    assert_eq!(on_post.len(), 5);

    // Unpublished posts cannot be commented on.
    ctx.server
        .post("/comments")
        .json(&json!({ "text": "nope", "author": "2", "post": "12" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let ctx = TestContext::new();

    let user: User = ctx.server.delete("/users/4").await.json();
    assert_eq!(user.name, "Jacob");

    ctx.server.get("/users/4").await.assert_status_not_found();
    ctx.server.get("/posts/11").await.assert_status_not_found();
    ctx.server.get("/comments/c1").await.assert_status_not_found();
    ctx.server.get("/comments/c2").await.assert_status_not_found();

    let remaining: Vec<Comment> = ctx.server.get("/comments").await.json();
    let ids: Vec<&str> = remaining.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c4"]);
}

#[tokio::test]
async fn test_relations() {
    let ctx = TestContext::new();

    let author: User = ctx.server.get("/posts/10/author").await.json();
    assert_eq!(author.id, "1");

    let posts: Vec<Post> = ctx.server.get("/users/1/posts").await.json();
    assert_eq!(posts.len(), 2);

    let comments: Vec<Comment> = ctx.server.get("/users/3/comments").await.json();
    assert_eq!(comments.len(), 2);

    ctx.server
        .get("/users/99/posts")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let ctx = TestContext::new();
    let _sub = ctx.state.registry.subscribe(Topic::new(COMMENT)).unwrap();

    ctx.server
        .patch("/comments/c1")
        .json(&json!({ "text": "edited" }))
        .await
        .assert_status_ok();

    let text = ctx.server.get("/metrics").await.text();
    assert!(text.contains("postfeed_notifications_total 1"));
    assert!(text.contains("postfeed_subscriptions_active 1"));
}

#[tokio::test]
async fn test_empty_store() {
    let ctx = TestContext::with_config(ServerConfig::new().without_seed());
    let users: Vec<User> = ctx.server.get("/users").await.json();
    assert!(users.is_empty());
}

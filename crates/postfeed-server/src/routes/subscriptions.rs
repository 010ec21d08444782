//! Live subscription endpoints.
//!
//! Each endpoint opens a channel on the topic registry and upgrades to a
//! WebSocket that carries one JSON [`SubscriptionPayload`] text frame per
//! event. The channel is opened before the upgrade, so events published
//! while the handshake completes are buffered rather than lost. Closing the
//! socket cancels the subscription.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use postfeed_core::{Subscription, TopicRegistry};
use postfeed_proto::topic::{COMMENT, POST, SCOPE_SEPARATOR, USER};
use postfeed_proto::{Resource, SubscriptionPayload, Topic};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::AppState;

/// Query parameters for comment subscriptions.
#[derive(Debug, Default, Deserialize)]
pub struct CommentSubscriptionQuery {
    /// Only receive comments on this post.
    pub post_id: Option<String>,
}

/// Subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/post", get(subscribe_posts))
        .route("/subscriptions/user", get(subscribe_users))
        .route("/subscriptions/comment", get(subscribe_comments))
}

async fn subscribe_posts(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let subscription = state.registry.subscribe(Topic::new(POST))?;
    Ok(ws.on_upgrade(move |socket| forward_events(socket, subscription, state.registry)))
}

async fn subscribe_users(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let subscription = state.registry.subscribe(Topic::new(USER))?;
    Ok(ws.on_upgrade(move |socket| forward_events(socket, subscription, state.registry)))
}

async fn subscribe_comments(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<CommentSubscriptionQuery>,
) -> Result<Response, AppError> {
    let topic = comment_topic(&state, query.post_id.as_deref())?;
    let subscription = state.registry.subscribe(topic)?;
    Ok(ws.on_upgrade(move |socket| forward_events(socket, subscription, state.registry)))
}

/// Resolve the topic for a comment subscription.
///
/// A per-post subscription requires a well-formed post ID naming a published
/// post, and scoped comment delivery to be enabled.
pub fn comment_topic(state: &AppState, post_id: Option<&str>) -> Result<Topic, AppError> {
    let Some(post_id) = post_id else {
        return Ok(Topic::new(COMMENT));
    };

    if !state.config.scoped_comments {
        return Err(AppError::BadRequest(
            "per-post comment subscriptions are disabled".to_string(),
        ));
    }

    let topic: Topic = format!("{COMMENT}{SCOPE_SEPARATOR}{post_id}").parse()?;

    match state.store.post(post_id) {
        Some(post) if post.published => Ok(topic),
        _ => Err(AppError::NotFound(format!("post {post_id} not found"))),
    }
}

/// Pump events from the subscription to the socket until either side ends.
async fn forward_events(
    socket: WebSocket,
    mut subscription: Subscription<Resource>,
    registry: TopicRegistry<Resource>,
) {
    let (mut sender, mut receiver) = socket.split();
    debug!(
        subscription_id = subscription.id(),
        topic = %subscription.topic(),
        "subscriber connected"
    );

    loop {
        tokio::select! {
            event = subscription.recv() => {
                // None: the registry shut down.
                let Some(event) = event else { break };

                let text = match SubscriptionPayload::from(event).to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode subscription payload");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let Some(info) = registry.subscription_info(subscription.id()) {
        debug!(
            subscription_id = info.id,
            age_ms = info.age().as_millis() as u64,
            events_delivered = info.events_delivered,
            events_dropped = info.events_dropped,
            "subscriber disconnected"
        );
    }
    subscription.cancel();
    let _ = sender.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;

    #[test]
    fn test_comment_topic_flat() {
        let state = AppState::new(ServerConfig::new());
        assert_eq!(comment_topic(&state, None).unwrap(), Topic::new(COMMENT));
    }

    #[test]
    fn test_comment_topic_scoped_to_published_post() {
        let state = AppState::new(ServerConfig::new());
        assert_eq!(
            comment_topic(&state, Some("10")).unwrap(),
            Topic::scoped(COMMENT, "10")
        );
    }

    #[test]
    fn test_comment_topic_rejects_hidden_or_missing_post() {
        let state = AppState::new(ServerConfig::new());
        assert!(matches!(
            comment_topic(&state, Some("12")),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            comment_topic(&state, Some("404")),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_comment_topic_rejects_malformed_post_id() {
        let state = AppState::new(ServerConfig::new());
        assert!(matches!(
            comment_topic(&state, Some("")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_comment_topic_scoping_disabled() {
        let state = AppState::new(ServerConfig::new().without_scoped_comments());
        assert!(matches!(
            comment_topic(&state, Some("10")),
            Err(AppError::BadRequest(_))
        ));
    }
}

//! Post endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use postfeed_proto::{Comment, CreatePostInput, Post, UpdatePostInput, User};

use super::ListQuery;
use crate::error::{AppError, Error};
use crate::AppState;

/// Post routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:id",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/:id/author", get(post_author))
        .route("/posts/:id/comments", get(post_comments))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Post>> {
    Json(state.store.posts(query.query.as_deref()))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .store
        .post(&id)
        .ok_or_else(|| Error::not_found("post", &id))?;
    Ok(Json(post))
}

async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.executor.create_post(input)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.executor.update_post(&id, input)?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.executor.delete_post(&id)?))
}

async fn post_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let post = state
        .store
        .post(&id)
        .ok_or_else(|| Error::not_found("post", &id))?;
    let author = state
        .store
        .user(&post.author)
        .ok_or_else(|| Error::not_found("user", &post.author))?;
    Ok(Json(author))
}

async fn post_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    if state.store.post(&id).is_none() {
        return Err(Error::not_found("post", &id).into());
    }
    Ok(Json(state.store.comments_for_post(&id)))
}

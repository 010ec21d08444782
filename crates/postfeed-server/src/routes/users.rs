//! User endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use postfeed_proto::{Comment, CreateUserInput, Post, UpdateUserInput, User};

use super::ListQuery;
use crate::error::{AppError, Error};
use crate::AppState;

/// User routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/posts", get(user_posts))
        .route("/users/:id/comments", get(user_comments))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<User>> {
    Json(state.store.users(query.query.as_deref()))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state
        .store
        .user(&id)
        .ok_or_else(|| Error::not_found("user", &id))?;
    Ok(Json(user))
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.executor.create_user(input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.executor.update_user(&id, input)?))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.executor.delete_user(&id)?))
}

async fn user_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Post>>, AppError> {
    if state.store.user(&id).is_none() {
        return Err(Error::not_found("user", &id).into());
    }
    Ok(Json(state.store.posts_by_author(&id)))
}

async fn user_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    if state.store.user(&id).is_none() {
        return Err(Error::not_found("user", &id).into());
    }
    Ok(Json(state.store.comments_by_author(&id)))
}

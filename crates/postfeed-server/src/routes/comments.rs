//! Comment endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use postfeed_proto::{Comment, CreateCommentInput, UpdateCommentInput};

use crate::error::{AppError, Error};
use crate::AppState;

/// Comment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route(
            "/comments/:id",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
}

async fn list_comments(State(state): State<AppState>) -> Json<Vec<Comment>> {
    Json(state.store.comments())
}

async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .store
        .comment(&id)
        .ok_or_else(|| Error::not_found("comment", &id))?;
    Ok(Json(comment))
}

async fn create_comment(
    State(state): State<AppState>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state.executor.create_comment(input)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCommentInput>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.executor.update_comment(&id, input)?))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.executor.delete_comment(&id)?))
}

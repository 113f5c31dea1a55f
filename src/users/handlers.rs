use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::state::AppState;

use super::dto::{
    CreateUserRequest, DeleteUserResponse, ListUsersParams, UpdateUserRequest, UserListResponse,
};
use super::error::{ApiError, ValidationError};
use super::repo_types::{User, UserId};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn check_id(id: UserId) -> Result<UserId, ValidationError> {
    if id <= 0 {
        warn!(id, "invalid user id");
        return Err(ValidationError::new("User ID is required"));
    }
    Ok(id)
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let new_user = payload.validate().map_err(|e| {
        warn!(error = %e, "create rejected");
        e
    })?;
    let user = state.users.create(new_user).await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.get_by_id(check_id(id)?).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<UserListResponse>, ApiError> {
    let query = params.validate().map_err(|e| {
        warn!(error = %e, "list rejected");
        e
    })?;
    let (list, total) = state.users.get_list(query).await?;
    Ok(Json(UserListResponse {
        list,
        total,
        page: params.page,
        size: params.size,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let id = check_id(id)?;
    let patch = payload.validate().map_err(|e| {
        warn!(error = %e, "update rejected");
        e
    })?;
    let user = state.users.update(id, patch).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    state.users.delete(check_id(id)?).await?;
    Ok(Json(DeleteUserResponse { success: true }))
}

// src/handlers/users.rs

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{PatchUserRequest, ReplaceUserRequest, UserChanges, UserResponse},
    state::AppState,
    utils::{hash::hash_password, jwt::Claims},
};

/// Replaces a user's username and password.
/// Admin only. The email must be supplied but is not changed.
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ReplaceUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let changes = UserChanges {
        username: Some(payload.username),
        password: Some(hash_password(&payload.password)?),
    };

    let user = state.users.update_user(id, changes).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Updates the supplied fields of a user.
/// Admin only.
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PatchUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let password = match payload.password {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let user = state
        .users
        .update_user(
            id,
            UserChanges {
                username: payload.username,
                password,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.user_id() == Some(id) {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    if !state.users.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} deleted by admin {}", id, claims.sub);

    Ok(Json(json!({ "message": "User deleted" })))
}

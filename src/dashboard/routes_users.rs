//! User management API — admin only.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::middleware_auth::RequireAdmin;
use super::AppState;

/// GET /api/users — List all accounts.
pub(super) async fn handler_users_list(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> impl IntoResponse {
    match state.db.get_users().await {
        Ok(users) => Json(serde_json::json!(users)).into_response(),
        Err(e) => {
            warn!(error = %e, "user list failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to list users"})),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub(super) struct CreateUserPayload {
    email: String,
    password: String,
    role: String,
    display_name: Option<String>,
}

/// POST /api/users — Create an account with a role.
pub(super) async fn handler_user_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Json(payload): Json<CreateUserPayload>,
) -> impl IntoResponse {
    if payload.password.len() < 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Password must be at least 8 characters"})),
        )
            .into_response();
    }
    match state
        .db
        .create_user(
            &payload.email,
            &payload.password,
            &payload.role,
            payload.display_name.as_deref(),
        )
        .await
    {
        Ok(profile) => (StatusCode::CREATED, Json(serde_json::json!(profile))).into_response(),
        Err(e) => {
            warn!(error = %e, "user create failed");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub(super) struct SetRolePayload {
    role: String,
}

/// PUT /api/users/{id}/role — Change an account's role.
pub(super) async fn handler_user_set_role(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(user_id): AxumPath<uuid::Uuid>,
    Json(payload): Json<SetRolePayload>,
) -> impl IntoResponse {
    match state.db.update_user_role(user_id, &payload.role).await {
        Ok(true) => Json(serde_json::json!({"updated": true})).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "User not found"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// DELETE /api/users/{id} — Remove an account.
pub(super) async fn handler_user_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(auth): RequireAdmin,
    AxumPath(user_id): AxumPath<uuid::Uuid>,
) -> impl IntoResponse {
    if auth.user_id == user_id {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Cannot delete your own account"})),
        )
            .into_response();
    }
    match state.db.delete_user(user_id).await {
        Ok(true) => Json(serde_json::json!({"deleted": true})).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "User not found"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "user delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to delete user"})),
            )
                .into_response()
        }
    }
}

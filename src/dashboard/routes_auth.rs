//! Auth API — credential login and profile lookup.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::middleware_auth::{issue_jwt, RequireAuth};
use super::AppState;

#[derive(Deserialize)]
pub(super) struct LoginPayload {
    email: String,
    password: String,
}

/// POST /api/auth/login — Verify credentials and issue a JWT.
///
/// Rate-limited per email: repeated attempts against one account trip the
/// fixed-window limiter regardless of source address. Failures return a
/// uniform 401 so the response does not reveal whether the account exists.
pub(super) async fn handler_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    let key = payload.email.trim().to_lowercase();
    if !state.login_limiter.check(&key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"error": "Too many login attempts, try again later"})),
        )
            .into_response();
    }

    match state.db.verify_credentials(&key, &payload.password).await {
        Ok(Some(profile)) => match issue_jwt(profile.id, &profile.role) {
            Ok(token) => {
                info!(user_id = %profile.id, role = %profile.role, "login succeeded");
                Json(serde_json::json!({"token": token, "user": profile})).into_response()
            }
            Err(e) => {
                warn!(error = %e, "token issue failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "Login is unavailable"})),
                )
                    .into_response()
            }
        },
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Invalid email or password"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "credential check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Login is unavailable"})),
            )
                .into_response()
        }
    }
}

/// GET /api/auth/me — Returns the authenticated user's own profile.
pub(super) async fn handler_me(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth_user): RequireAuth,
) -> impl IntoResponse {
    match state.db.get_user_profile(auth_user.user_id).await {
        Ok(Some(profile)) => Json(serde_json::json!(profile)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Profile not found"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "profile fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to fetch profile"})),
            )
                .into_response()
        }
    }
}

//! JWT auth middleware for dashboard API routes.
//!
//! Tokens are issued by the login handler (HS256, secret from
//! `SITEBEAM_JWT_SECRET`) and carried as `Authorization: Bearer <token>`.
//! The user's role is re-read from `user_profiles` on every request, so a
//! demotion takes effect before the token expires. Role-gated routes use
//! the `RequireAdmin` / `RequireForeman` extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::db::users::{ROLE_ADMIN, ROLE_FOREMAN};

/// Token lifetime: 12 hours.
const TOKEN_TTL_SECS: i64 = 12 * 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject — the account UUID.
    sub: String,
    /// Role at issue time. Advisory only; authorization re-reads the DB.
    role: String,
    exp: i64,
    iat: i64,
}

/// Authenticated user info, injected into handlers via extractors.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Admins pass foreman gates too.
    pub fn is_foreman(&self) -> bool {
        self.role == ROLE_FOREMAN || self.role == ROLE_ADMIN
    }
}

fn jwt_secret() -> Option<String> {
    std::env::var("SITEBEAM_JWT_SECRET").ok()
}

/// Issue a signed token for an authenticated account.
///
/// Fails when `SITEBEAM_JWT_SECRET` is unset — logins are impossible
/// without a signing key, by intent.
pub fn issue_jwt(user_id: uuid::Uuid, role: &str) -> Result<String, String> {
    let secret = jwt_secret().ok_or_else(|| "SITEBEAM_JWT_SECRET is not set".to_string())?;
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT signing failed: {}", e))
}

fn decode_jwt(token: &str) -> Result<Claims, String> {
    let secret = jwt_secret().ok_or_else(|| "SITEBEAM_JWT_SECRET is not set".to_string())?;
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| format!("JWT verification failed: {}", e))?;
    Ok(data.claims)
}

/// Extract auth info from the request, if present and valid.
pub async fn extract_auth_user(state: &Arc<AppState>, parts: &Parts) -> Option<AuthUser> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?;
    let claims = decode_jwt(token).ok()?;
    let user_id = uuid::Uuid::parse_str(&claims.sub).ok()?;

    // Fresh role lookup; defaults to "client" when the profile is gone.
    let role = state.db.get_user_role(user_id).await.ok()?;

    Some(AuthUser { user_id, role })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Authentication required"})),
    )
        .into_response()
}

fn forbidden(needed: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({"error": format!("{} access required", needed)})),
    )
        .into_response()
}

/// Extractor that requires any authenticated user.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;
        Ok(RequireAuth(auth_user))
    }
}

/// Extractor that requires an authenticated admin.
///
/// Returns 401 without a valid token, 403 for non-admins.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;
        if !auth_user.is_admin() {
            return Err(forbidden("Admin"));
        }
        Ok(RequireAdmin(auth_user))
    }
}

/// Extractor that requires a foreman (or admin).
pub struct RequireForeman(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireForeman {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = extract_auth_user(state, parts)
            .await
            .ok_or_else(unauthorized)?;
        if !auth_user.is_foreman() {
            return Err(forbidden("Foreman"));
        }
        Ok(RequireForeman(auth_user))
    }
}

//! Public content API — portfolio, articles, testimonials.
//!
//! Reads are public but only surface published/approved items unless the
//! caller is an admin. Writes are admin-only, except testimonial
//! submission which any authenticated client may do.

use axum::extract::{Path as AxumPath, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::middleware_auth::{extract_auth_user, RequireAdmin, RequireAuth};
use super::AppState;

/// Whether the (optional) caller is an admin, for public read endpoints
/// that show drafts to admins only.
async fn caller_is_admin(state: &Arc<AppState>, parts: &Parts) -> bool {
    extract_auth_user(state, parts)
        .await
        .map(|u| u.is_admin())
        .unwrap_or(false)
}

// ── Portfolio ───────────────────────────────────────────────────

/// GET /api/portfolio — Published entries; admins see drafts too.
pub(super) async fn handler_portfolio_list(
    State(state): State<Arc<AppState>>,
    parts: Parts,
) -> impl IntoResponse {
    let published_only = !caller_is_admin(&state, &parts).await;
    match state.db.get_portfolio_entries(published_only).await {
        Ok(entries) => Json(serde_json::json!(entries)).into_response(),
        Err(e) => storage_failure(e, "portfolio list failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct CreatePortfolioPayload {
    title: String,
    summary: Option<String>,
    image_url: Option<String>,
    project_id: Option<i64>,
    #[serde(default)]
    published: bool,
}

/// POST /api/portfolio — Create an entry (admin).
pub(super) async fn handler_portfolio_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Json(payload): Json<CreatePortfolioPayload>,
) -> impl IntoResponse {
    match state
        .db
        .create_portfolio_entry(
            payload.title.trim(),
            payload.summary.as_deref(),
            payload.image_url.as_deref(),
            payload.project_id,
            payload.published,
        )
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(serde_json::json!(entry))).into_response(),
        Err(e) => storage_failure(e, "portfolio create failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct PublishedPayload {
    published: bool,
}

/// PUT /api/portfolio/{id}/published — Publish or unpublish (admin).
pub(super) async fn handler_portfolio_set_published(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(entry_id): AxumPath<i64>,
    Json(payload): Json<PublishedPayload>,
) -> impl IntoResponse {
    match state
        .db
        .set_portfolio_published(entry_id, payload.published)
        .await
    {
        Ok(true) => Json(serde_json::json!({"published": payload.published})).into_response(),
        Ok(false) => not_found("Portfolio entry not found"),
        Err(e) => storage_failure(e, "portfolio publish failed"),
    }
}

/// DELETE /api/portfolio/{id} — Remove an entry (admin).
pub(super) async fn handler_portfolio_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(entry_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.delete_portfolio_entry(entry_id).await {
        Ok(true) => Json(serde_json::json!({"deleted": true})).into_response(),
        Ok(false) => not_found("Portfolio entry not found"),
        Err(e) => storage_failure(e, "portfolio delete failed"),
    }
}

// ── Articles ────────────────────────────────────────────────────

/// GET /api/articles — Published articles; admins see drafts too.
pub(super) async fn handler_articles_list(
    State(state): State<Arc<AppState>>,
    parts: Parts,
) -> impl IntoResponse {
    let published_only = !caller_is_admin(&state, &parts).await;
    match state.db.get_articles(published_only).await {
        Ok(articles) => Json(serde_json::json!(articles)).into_response(),
        Err(e) => storage_failure(e, "article list failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateArticlePayload {
    title: String,
    body: String,
    #[serde(default)]
    published: bool,
}

/// POST /api/articles — Create an article (admin).
pub(super) async fn handler_article_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Json(payload): Json<CreateArticlePayload>,
) -> impl IntoResponse {
    match state
        .db
        .create_article(payload.title.trim(), &payload.body, payload.published)
        .await
    {
        Ok(article) => (StatusCode::CREATED, Json(serde_json::json!(article))).into_response(),
        Err(e) => storage_failure(e, "article create failed"),
    }
}

/// GET /api/articles/{slug} — Fetch one article. Drafts 404 for non-admins.
pub(super) async fn handler_article_get(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
    parts: Parts,
) -> impl IntoResponse {
    let is_admin = caller_is_admin(&state, &parts).await;
    match state.db.get_article_by_slug(&slug).await {
        Ok(Some(article)) if article.published || is_admin => {
            Json(serde_json::json!(article)).into_response()
        }
        Ok(_) => not_found("Article not found"),
        Err(e) => storage_failure(e, "article fetch failed"),
    }
}

/// DELETE /api/articles/id/{id} — Remove an article (admin).
pub(super) async fn handler_article_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(article_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.delete_article(article_id).await {
        Ok(true) => Json(serde_json::json!({"deleted": true})).into_response(),
        Ok(false) => not_found("Article not found"),
        Err(e) => storage_failure(e, "article delete failed"),
    }
}

// ── Testimonials ────────────────────────────────────────────────

/// GET /api/testimonials — Approved testimonials; admins see all.
pub(super) async fn handler_testimonials_list(
    State(state): State<Arc<AppState>>,
    parts: Parts,
) -> impl IntoResponse {
    let approved_only = !caller_is_admin(&state, &parts).await;
    match state.db.get_testimonials(approved_only).await {
        Ok(rows) => Json(serde_json::json!(rows)).into_response(),
        Err(e) => storage_failure(e, "testimonial list failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateTestimonialPayload {
    author_name: String,
    quote: String,
    rating: i32,
    project_id: Option<i64>,
}

/// POST /api/testimonials — Submit a testimonial (any authenticated user).
/// Starts unapproved; an admin reviews before it appears publicly.
pub(super) async fn handler_testimonial_create(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Json(payload): Json<CreateTestimonialPayload>,
) -> impl IntoResponse {
    match state
        .db
        .create_testimonial(
            payload.author_name.trim(),
            payload.quote.trim(),
            payload.rating,
            payload.project_id,
        )
        .await
    {
        Ok(row) => (StatusCode::CREATED, Json(serde_json::json!(row))).into_response(),
        Err(e) => storage_failure(e, "testimonial create failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct ApprovedPayload {
    approved: bool,
}

/// PUT /api/testimonials/{id}/approved — Approve or reject (admin).
pub(super) async fn handler_testimonial_set_approved(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(testimonial_id): AxumPath<i64>,
    Json(payload): Json<ApprovedPayload>,
) -> impl IntoResponse {
    match state
        .db
        .set_testimonial_approved(testimonial_id, payload.approved)
        .await
    {
        Ok(true) => Json(serde_json::json!({"approved": payload.approved})).into_response(),
        Ok(false) => not_found("Testimonial not found"),
        Err(e) => storage_failure(e, "testimonial approve failed"),
    }
}

/// DELETE /api/testimonials/{id} — Remove a testimonial (admin).
pub(super) async fn handler_testimonial_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(testimonial_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.delete_testimonial(testimonial_id).await {
        Ok(true) => Json(serde_json::json!({"deleted": true})).into_response(),
        Ok(false) => not_found("Testimonial not found"),
        Err(e) => storage_failure(e, "testimonial delete failed"),
    }
}

fn not_found(msg: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": msg})),
    )
        .into_response()
}

fn storage_failure(e: anyhow::Error, context: &str) -> axum::response::Response {
    warn!(error = %e, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Storage failure"})),
    )
        .into_response()
}

//! Project API — role-scoped reads, admin CRUD, foreman manual progress.
//!
//! The detail response embeds the reconciler's progress report, so
//! dashboards consume the server-computed value instead of re-deriving
//! progress from the milestone list themselves.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::middleware_auth::{RequireAdmin, RequireAuth, RequireForeman};
use super::{scope_for, AppState};
use crate::db::Database;
use crate::reconcile;

/// GET /api/projects — Projects visible to the caller.
pub(super) async fn handler_projects_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
) -> impl IntoResponse {
    match state.db.get_projects(scope_for(&auth)).await {
        Ok(projects) => Json(serde_json::json!(projects)).into_response(),
        Err(e) => {
            warn!(error = %e, "project list failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to list projects"})),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub(super) struct CreateProjectPayload {
    name: String,
    description: Option<String>,
    client_id: Option<uuid::Uuid>,
    foreman_id: Option<uuid::Uuid>,
}

/// POST /api/projects — Create a project (admin).
pub(super) async fn handler_project_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    Json(payload): Json<CreateProjectPayload>,
) -> impl IntoResponse {
    if payload.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Project name is required"})),
        )
            .into_response();
    }
    match state
        .db
        .create_project(
            payload.name.trim(),
            payload.description.as_deref(),
            payload.client_id,
            payload.foreman_id,
        )
        .await
    {
        Ok(project) => (StatusCode::CREATED, Json(serde_json::json!(project))).into_response(),
        Err(e) => {
            warn!(error = %e, "project create failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to create project"})),
            )
                .into_response()
        }
    }
}

/// GET /api/projects/{id} — Project detail with milestones, expense total,
/// and the reconciler's progress report.
pub(super) async fn handler_project_get(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    AxumPath(project_id): AxumPath<i64>,
) -> impl IntoResponse {
    let project = match state.db.get_project(project_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return not_found(),
        Err(e) => return storage_failure(e, "project fetch failed"),
    };
    // Out-of-scope reads 404 instead of 403 so project ids don't leak.
    if !Database::project_in_scope(&project, scope_for(&auth)) {
        return not_found();
    }

    let milestones = match state.db.get_milestones(project_id).await {
        Ok(m) => m,
        Err(e) => return storage_failure(e, "milestone fetch failed"),
    };
    let expense_total = match state.db.expense_total(project_id).await {
        Ok(t) => t,
        Err(e) => return storage_failure(e, "expense total failed"),
    };
    let report = match reconcile::progress_report(&state.db, project_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return not_found(),
        Err(e) => return storage_failure(e, "progress report failed"),
    };
    state
        .metrics
        .reconcile_runs
        .get_or_create(&crate::metrics::ModeLabel {
            mode: "report".to_string(),
        })
        .inc();

    Json(serde_json::json!({
        "project": project,
        "milestones": milestones,
        "expense_total": expense_total,
        "progress_report": report,
    }))
    .into_response()
}

#[derive(Deserialize)]
pub(super) struct UpdateProjectPayload {
    name: String,
    description: Option<String>,
    client_id: Option<uuid::Uuid>,
    foreman_id: Option<uuid::Uuid>,
}

/// PUT /api/projects/{id} — Update metadata and assignments (admin).
pub(super) async fn handler_project_update(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(project_id): AxumPath<i64>,
    Json(payload): Json<UpdateProjectPayload>,
) -> impl IntoResponse {
    match state
        .db
        .update_project(
            project_id,
            payload.name.trim(),
            payload.description.as_deref(),
            payload.client_id,
            payload.foreman_id,
        )
        .await
    {
        Ok(Some(project)) => Json(serde_json::json!(project)).into_response(),
        Ok(None) => not_found(),
        Err(e) => storage_failure(e, "project update failed"),
    }
}

/// DELETE /api/projects/{id} — Remove a project and its children (admin).
pub(super) async fn handler_project_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(project_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.delete_project(project_id).await {
        Ok(true) => Json(serde_json::json!({"deleted": true})).into_response(),
        Ok(false) => not_found(),
        Err(e) => storage_failure(e, "project delete failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct SetProgressPayload {
    progress: i32,
}

/// PUT /api/projects/{id}/progress — Manual progress override (foreman).
///
/// Accepted and persisted as-is; no reconciliation runs here, so the value
/// can disagree with the milestone-derived one until the next repair pass.
pub(super) async fn handler_project_set_progress(
    State(state): State<Arc<AppState>>,
    RequireForeman(auth): RequireForeman,
    AxumPath(project_id): AxumPath<i64>,
    Json(payload): Json<SetProgressPayload>,
) -> impl IntoResponse {
    if !(0..=100).contains(&payload.progress) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Progress must be between 0 and 100"})),
        )
            .into_response();
    }
    // Foremen may only touch their own assignments.
    match state.db.get_project(project_id).await {
        Ok(Some(p)) => {
            if !Database::project_in_scope(&p, scope_for(&auth)) {
                return not_found();
            }
        }
        Ok(None) => return not_found(),
        Err(e) => return storage_failure(e, "project fetch failed"),
    }
    match state
        .db
        .set_manual_progress(project_id, payload.progress)
        .await
    {
        Ok(true) => Json(serde_json::json!({"progress": payload.progress})).into_response(),
        Ok(false) => not_found(),
        Err(e) => storage_failure(e, "manual progress failed"),
    }
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Project not found"})),
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

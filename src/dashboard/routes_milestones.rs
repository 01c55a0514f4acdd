//! Milestone API — foreman/admin CRUD.
//!
//! Every mutation reconciles the parent project afterwards, so the
//! persisted progress/status track the milestone set without waiting for
//! an admin repair pass.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::middleware_auth::{RequireAuth, RequireForeman};
use super::{scope_for, AppState};
use crate::db::Database;
use crate::reconcile::{self, MilestoneStatus};

/// GET /api/projects/{id}/milestones — Milestones for a visible project.
pub(super) async fn handler_milestones_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    AxumPath(project_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.get_project(project_id).await {
        Ok(Some(p)) if Database::project_in_scope(&p, scope_for(&auth)) => {}
        Ok(_) => return not_found("Project not found"),
        Err(e) => return storage_failure(e, "project fetch failed"),
    }
    match state.db.get_milestones(project_id).await {
        Ok(milestones) => Json(serde_json::json!(milestones)).into_response(),
        Err(e) => storage_failure(e, "milestone list failed"),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateMilestonePayload {
    name: String,
    description: Option<String>,
    target_date: Option<chrono::NaiveDate>,
}

/// POST /api/projects/{id}/milestones — Add a milestone (foreman).
pub(super) async fn handler_milestone_create(
    State(state): State<Arc<AppState>>,
    RequireForeman(auth): RequireForeman,
    AxumPath(project_id): AxumPath<i64>,
    Json(payload): Json<CreateMilestonePayload>,
) -> impl IntoResponse {
    match state.db.get_project(project_id).await {
        Ok(Some(p)) if Database::project_in_scope(&p, scope_for(&auth)) => {}
        Ok(_) => return not_found("Project not found"),
        Err(e) => return storage_failure(e, "project fetch failed"),
    }
    let milestone = match state
        .db
        .create_milestone(
            project_id,
            payload.name.trim(),
            payload.description.as_deref(),
            payload.target_date,
        )
        .await
    {
        Ok(m) => m,
        Err(e) => return storage_failure(e, "milestone create failed"),
    };
    reconcile_parent(&state, project_id).await;
    (StatusCode::CREATED, Json(serde_json::json!(milestone))).into_response()
}

#[derive(Deserialize)]
pub(super) struct UpdateMilestonePayload {
    name: String,
    description: Option<String>,
    target_date: Option<chrono::NaiveDate>,
    status: MilestoneStatus,
}

/// PUT /api/milestones/{id} — Update a milestone (foreman).
pub(super) async fn handler_milestone_update(
    State(state): State<Arc<AppState>>,
    RequireForeman(auth): RequireForeman,
    AxumPath(milestone_id): AxumPath<i64>,
    Json(payload): Json<UpdateMilestonePayload>,
) -> impl IntoResponse {
    let project_id = match milestone_project_in_scope(&state, &auth, milestone_id).await {
        Ok(Some(id)) => id,
        Ok(None) => return not_found("Milestone not found"),
        Err(resp) => return resp,
    };
    let updated = match state
        .db
        .update_milestone(
            milestone_id,
            payload.name.trim(),
            payload.description.as_deref(),
            payload.target_date,
            payload.status,
        )
        .await
    {
        Ok(Some(m)) => m,
        Ok(None) => return not_found("Milestone not found"),
        Err(e) => return storage_failure(e, "milestone update failed"),
    };
    reconcile_parent(&state, project_id).await;
    Json(serde_json::json!(updated)).into_response()
}

/// DELETE /api/milestones/{id} — Remove a milestone (foreman).
pub(super) async fn handler_milestone_delete(
    State(state): State<Arc<AppState>>,
    RequireForeman(auth): RequireForeman,
    AxumPath(milestone_id): AxumPath<i64>,
) -> impl IntoResponse {
    match milestone_project_in_scope(&state, &auth, milestone_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("Milestone not found"),
        Err(resp) => return resp,
    }
    match state.db.delete_milestone(milestone_id).await {
        Ok(Some(project_id)) => {
            reconcile_parent(&state, project_id).await;
            Json(serde_json::json!({"deleted": true})).into_response()
        }
        Ok(None) => not_found("Milestone not found"),
        Err(e) => storage_failure(e, "milestone delete failed"),
    }
}

/// Resolve a milestone's parent project and check it is visible to the
/// caller. Out-of-scope milestones read as missing.
async fn milestone_project_in_scope(
    state: &Arc<AppState>,
    auth: &super::middleware_auth::AuthUser,
    milestone_id: i64,
) -> Result<Option<i64>, axum::response::Response> {
    let milestone = match state.db.get_milestone(milestone_id).await {
        Ok(Some(m)) => m,
        Ok(None) => return Ok(None),
        Err(e) => return Err(storage_failure(e, "milestone fetch failed")),
    };
    match state.db.get_project(milestone.project_id).await {
        Ok(Some(p)) if Database::project_in_scope(&p, scope_for(auth)) => {
            Ok(Some(milestone.project_id))
        }
        Ok(_) => Ok(None),
        Err(e) => Err(storage_failure(e, "project fetch failed")),
    }
}

/// Repair the parent project after a milestone mutation. A failed
/// reconcile is logged but does not fail the mutation — the drift shows up
/// in the admin audit instead.
async fn reconcile_parent(state: &Arc<AppState>, project_id: i64) {
    state
        .metrics
        .reconcile_runs
        .get_or_create(&crate::metrics::ModeLabel {
            mode: "repair".to_string(),
        })
        .inc();
    if let Err(e) = reconcile::repair_project(&state.db, project_id).await {
        warn!(project_id, error = %e, "post-mutation reconcile failed");
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

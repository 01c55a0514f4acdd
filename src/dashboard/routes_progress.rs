//! Progress reconciliation API — admin only.
//!
//! Report mode audits drift between persisted progress/status and the
//! milestone-derived values; fix mode repairs it. See `crate::reconcile`
//! for the derivation rules.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use tracing::{info, warn};

use super::middleware_auth::RequireAdmin;
use super::AppState;
use crate::metrics::ModeLabel;
use crate::reconcile;

/// GET /api/progress/{project_id} — Drift report for one project.
pub(super) async fn handler_report(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(project_id): AxumPath<i64>,
) -> impl IntoResponse {
    count_run(&state, "report");
    match reconcile::progress_report(&state.db, project_id).await {
        Ok(Some(report)) => Json(serde_json::json!(report)).into_response(),
        Ok(None) => not_found(),
        Err(e) => storage_failure(e, "progress report failed"),
    }
}

/// GET /api/progress/needing-update — Reports for every drifted project.
pub(super) async fn handler_needing_update(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> impl IntoResponse {
    count_run(&state, "report");
    match reconcile::reports_needing_update(&state.db).await {
        Ok(reports) => {
            state
                .metrics
                .projects_needing_update
                .set(reports.len() as i64);
            Json(serde_json::json!(reports)).into_response()
        }
        Err(e) => storage_failure(e, "drift audit failed"),
    }
}

/// POST /api/progress/{project_id}/fix — Repair one project.
pub(super) async fn handler_fix(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
    AxumPath(project_id): AxumPath<i64>,
) -> impl IntoResponse {
    count_run(&state, "repair");
    match reconcile::repair_project(&state.db, project_id).await {
        Ok(Some(outcome)) => {
            info!(
                project_id,
                before_progress = outcome.before.progress,
                after_progress = outcome.after.progress,
                after_status = %outcome.after.status,
                "project repaired"
            );
            Json(serde_json::json!(outcome)).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => storage_failure(e, "repair failed"),
    }
}

/// POST /api/progress/fix-all — Repair every drifted project.
pub(super) async fn handler_fix_all(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_): RequireAdmin,
) -> impl IntoResponse {
    count_run(&state, "batch");
    match reconcile::repair_all(&state.db).await {
        Ok(batch) => {
            info!(
                fixed = batch.fixed_count,
                examined = batch.total_examined,
                "batch repair finished"
            );
            Json(serde_json::json!(batch)).into_response()
        }
        Err(e) => storage_failure(e, "batch repair failed"),
    }
}

fn count_run(state: &Arc<AppState>, mode: &str) {
    state
        .metrics
        .reconcile_runs
        .get_or_create(&ModeLabel {
            mode: mode.to_string(),
        })
        .inc();
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

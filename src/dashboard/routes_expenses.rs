//! Material-expense API — foreman/admin writes, role-scoped reads.

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

/// GET /api/projects/{id}/expenses — Expenses with the project total.
pub(super) async fn handler_expenses_list(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    AxumPath(project_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.get_project(project_id).await {
        Ok(Some(p)) if Database::project_in_scope(&p, scope_for(&auth)) => {}
        Ok(_) => return not_found("Project not found"),
        Err(e) => return storage_failure(e, "project fetch failed"),
    }
    let expenses = match state.db.get_expenses(project_id).await {
        Ok(rows) => rows,
        Err(e) => return storage_failure(e, "expense list failed"),
    };
    let total = match state.db.expense_total(project_id).await {
        Ok(t) => t,
        Err(e) => return storage_failure(e, "expense total failed"),
    };
    Json(serde_json::json!({"expenses": expenses, "total": total})).into_response()
}

#[derive(Deserialize)]
pub(super) struct CreateExpensePayload {
    material: String,
    quantity: f64,
    unit: Option<String>,
    unit_cost: f64,
    purchased_at: Option<chrono::NaiveDate>,
}

/// POST /api/projects/{id}/expenses — Record a purchase (foreman).
pub(super) async fn handler_expense_create(
    State(state): State<Arc<AppState>>,
    RequireForeman(auth): RequireForeman,
    AxumPath(project_id): AxumPath<i64>,
    Json(payload): Json<CreateExpensePayload>,
) -> impl IntoResponse {
    if payload.quantity <= 0.0 || payload.unit_cost < 0.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Quantity must be positive and unit cost non-negative"})),
        )
            .into_response();
    }
    match state.db.get_project(project_id).await {
        Ok(Some(p)) if Database::project_in_scope(&p, scope_for(&auth)) => {}
        Ok(_) => return not_found("Project not found"),
        Err(e) => return storage_failure(e, "project fetch failed"),
    }
    match state
        .db
        .create_expense(
            project_id,
            payload.material.trim(),
            payload.quantity,
            payload.unit.as_deref(),
            payload.unit_cost,
            payload.purchased_at,
            Some(auth.user_id),
        )
        .await
    {
        Ok(expense) => (StatusCode::CREATED, Json(serde_json::json!(expense))).into_response(),
        Err(e) => storage_failure(e, "expense create failed"),
    }
}

/// DELETE /api/expenses/{id} — Remove an expense entry (foreman).
pub(super) async fn handler_expense_delete(
    State(state): State<Arc<AppState>>,
    RequireForeman(_): RequireForeman,
    AxumPath(expense_id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.db.delete_expense(expense_id).await {
        Ok(true) => Json(serde_json::json!({"deleted": true})).into_response(),
        Ok(false) => not_found("Expense not found"),
        Err(e) => storage_failure(e, "expense delete failed"),
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

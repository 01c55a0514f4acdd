//! # Dashboard — HTTP API Server
//!
//! Runs the Axum server behind the three role-scoped dashboards: JSON REST
//! API for projects, milestones, expenses, and content, plus the admin-only
//! progress reconciliation endpoints. Optionally serves a static frontend
//! build via `ServeDir`.

pub(crate) mod middleware_auth;
mod routes_auth;
mod routes_content;
mod routes_expenses;
mod routes_health;
mod routes_milestones;
mod routes_progress;
mod routes_projects;
mod routes_users;

use crate::db::{self, ProjectScope};
use crate::db::users::{ROLE_CLIENT, ROLE_FOREMAN};
use crate::metrics;
use crate::rate_limit::FixedWindowLimiter;
use crate::reconcile;
use anyhow::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};

pub struct AppState {
    pub db: db::Database,
    pub metrics: metrics::Metrics,
    pub login_limiter: FixedWindowLimiter,
}

impl AppState {
    pub fn with_db(db: db::Database) -> Arc<Self> {
        Arc::new(AppState {
            db,
            metrics: metrics::Metrics::new(),
            login_limiter: FixedWindowLimiter::for_login(),
        })
    }
}

/// Map an authenticated caller to a project visibility scope.
pub(super) fn scope_for(auth: &middleware_auth::AuthUser) -> ProjectScope {
    match auth.role.as_str() {
        ROLE_FOREMAN => ProjectScope::Foreman(auth.user_id),
        ROLE_CLIENT => ProjectScope::Client(auth.user_id),
        _ => ProjectScope::All,
    }
}

/// Middleware that records request duration into the Prometheus histogram,
/// generates (or propagates) a request ID for correlation, and wraps the
/// request in a tracing span using `.instrument()` for async propagation.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .metrics
        .http_request_duration
        .get_or_create(&metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    let mut response = response;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Normalize URL path to collapse high-cardinality segments (numeric IDs,
/// UUIDs, slugs under /articles/) into placeholders, preventing histogram
/// label explosion.
fn normalize_path(path: &str) -> String {
    let mut prev_was_articles = false;
    path.split('/')
        .map(|seg| {
            let collapsed = if seg.is_empty() {
                seg.to_string()
            } else if seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else if seg.len() == 36 && seg.chars().filter(|c| *c == '-').count() == 4 {
                ":uuid".to_string()
            } else if prev_was_articles {
                ":slug".to_string()
            } else {
                seg.to_string()
            };
            prev_was_articles = seg == "articles";
            collapsed
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        // Auth
        .route("/api/auth/login", post(routes_auth::handler_login))
        .route("/api/auth/me", get(routes_auth::handler_me))
        // User management (admin)
        .route(
            "/api/users",
            get(routes_users::handler_users_list).post(routes_users::handler_user_create),
        )
        .route(
            "/api/users/{id}/role",
            put(routes_users::handler_user_set_role),
        )
        .route("/api/users/{id}", delete(routes_users::handler_user_delete))
        // Projects
        .route(
            "/api/projects",
            get(routes_projects::handler_projects_list)
                .post(routes_projects::handler_project_create),
        )
        .route(
            "/api/projects/{id}",
            get(routes_projects::handler_project_get)
                .put(routes_projects::handler_project_update)
                .delete(routes_projects::handler_project_delete),
        )
        .route(
            "/api/projects/{id}/progress",
            put(routes_projects::handler_project_set_progress),
        )
        // Milestones
        .route(
            "/api/projects/{id}/milestones",
            get(routes_milestones::handler_milestones_list)
                .post(routes_milestones::handler_milestone_create),
        )
        .route(
            "/api/milestones/{id}",
            put(routes_milestones::handler_milestone_update)
                .delete(routes_milestones::handler_milestone_delete),
        )
        // Progress reconciliation (admin)
        .route(
            "/api/progress/needing-update",
            get(routes_progress::handler_needing_update),
        )
        .route(
            "/api/progress/fix-all",
            post(routes_progress::handler_fix_all),
        )
        .route(
            "/api/progress/{project_id}",
            get(routes_progress::handler_report),
        )
        .route(
            "/api/progress/{project_id}/fix",
            post(routes_progress::handler_fix),
        )
        // Expenses
        .route(
            "/api/projects/{id}/expenses",
            get(routes_expenses::handler_expenses_list)
                .post(routes_expenses::handler_expense_create),
        )
        .route(
            "/api/expenses/{id}",
            delete(routes_expenses::handler_expense_delete),
        )
        // Content
        .route(
            "/api/portfolio",
            get(routes_content::handler_portfolio_list)
                .post(routes_content::handler_portfolio_create),
        )
        .route(
            "/api/portfolio/{id}/published",
            put(routes_content::handler_portfolio_set_published),
        )
        .route(
            "/api/portfolio/{id}",
            delete(routes_content::handler_portfolio_delete),
        )
        .route(
            "/api/articles",
            get(routes_content::handler_articles_list)
                .post(routes_content::handler_article_create),
        )
        .route(
            "/api/articles/{slug}",
            get(routes_content::handler_article_get),
        )
        .route(
            "/api/articles/id/{id}",
            delete(routes_content::handler_article_delete),
        )
        .route(
            "/api/testimonials",
            get(routes_content::handler_testimonials_list)
                .post(routes_content::handler_testimonial_create),
        )
        .route(
            "/api/testimonials/{id}/approved",
            put(routes_content::handler_testimonial_set_approved),
        )
        .route(
            "/api/testimonials/{id}",
            delete(routes_content::handler_testimonial_delete),
        )
        // Health & metrics
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(CatchPanicLayer::new())
    .layer(axum::middleware::from_fn_with_state(
        state.clone(),
        metrics_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(1024 * 1024))
    .layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(30),
    ))
    .with_state(state)
}

pub async fn run(port: u16, database_url: &str, static_dir: Option<&Path>) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    let state = AppState::with_db(database);
    let app = build_router(state.clone(), static_dir);

    // Background audit loop: refresh drift and pool gauges. Read-only — the
    // admin decides when to repair.
    let audit_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            match reconcile::count_needing_update(&audit_state.db).await {
                Ok(n) => {
                    audit_state.metrics.projects_needing_update.set(n as i64);
                    if n > 0 {
                        info!(count = n, "audit: projects with progress drift");
                    }
                }
                Err(e) => warn!(error = %e, "audit: drift count failed"),
            }
            let pool_size = audit_state.db.pool().size();
            let pool_idle = audit_state.db.pool().num_idle();
            audit_state
                .metrics
                .db_pool_active
                .set((pool_size as i64) - (pool_idle as i64));
            audit_state.metrics.db_pool_idle.set(pool_idle as i64);
        }
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "dashboard running");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("dashboard shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! { _ = ctrl_c => info!("received SIGINT, shutting down"), _ = sigterm.recv() => info!("received SIGTERM, shutting down") }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_preserves_api_routes() {
        assert_eq!(normalize_path("/api/projects"), "/api/projects");
        assert_eq!(
            normalize_path("/api/progress/needing-update"),
            "/api/progress/needing-update"
        );
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn normalize_path_collapses_numeric_ids() {
        assert_eq!(normalize_path("/api/projects/42"), "/api/projects/:id");
        assert_eq!(
            normalize_path("/api/progress/7/fix"),
            "/api/progress/:id/fix"
        );
    }

    #[test]
    fn normalize_path_collapses_uuids() {
        assert_eq!(
            normalize_path("/api/users/550e8400-e29b-41d4-a716-446655440000"),
            "/api/users/:uuid"
        );
    }

    #[test]
    fn normalize_path_collapses_article_slugs() {
        assert_eq!(
            normalize_path("/api/articles/pouring-the-foundation"),
            "/api/articles/:slug"
        );
        assert_eq!(normalize_path("/api/articles"), "/api/articles");
    }

    #[test]
    fn normalize_path_handles_empty_and_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
    }
}

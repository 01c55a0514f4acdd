//! # Database — PostgreSQL Storage Layer
//!
//! Async storage operations for the tracking backend via `sqlx::PgPool`.
//!
//! ## Schema
//!
//! - `user_profiles`: credentialed accounts with a role (admin/foreman/client)
//! - `projects`: denormalized progress/status plus owning client and foreman
//! - `milestones`: dated work units per project, each with its own status
//! - `expenses`: material purchases per project
//! - `portfolio_entries`, `articles`, `testimonials`: public-facing content
//!
//! ## Module Structure
//!
//! Operations are split into submodules by domain:
//!
//! - [`users`] — account CRUD, credential verification, role lookup
//! - `projects` — project CRUD, role-scoped lists, reconciled writes
//! - `milestones` — milestone CRUD and the status-count aggregate that
//!   feeds the progress reconciler
//! - `expenses` — material-expense CRUD and per-project totals
//! - `portfolio`, `articles`, `testimonials` — content CRUD with
//!   published/approved filters for public reads

mod articles;
mod expenses;
mod milestones;
mod portfolio;
mod projects;
mod testimonials;
pub mod users;

pub use users::UserProfile;

use anyhow::Result;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

// ── Project types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub progress: i32,
    pub status: String,
    pub client_id: Option<uuid::Uuid>,
    pub foreman_id: Option<uuid::Uuid>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Visibility scope for project reads, derived from the caller's role.
/// Admins see everything, foremen their assignments, clients their own.
#[derive(Debug, Clone, Copy)]
pub enum ProjectScope {
    All,
    Foreman(uuid::Uuid),
    Client(uuid::Uuid),
}

// ── Milestone types ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MilestoneRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_date: Option<chrono::NaiveDate>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ── Expense types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ExpenseRow {
    pub id: i64,
    pub project_id: i64,
    pub material: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub purchased_at: Option<chrono::NaiveDate>,
    pub created_by: Option<uuid::Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ── Content types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PortfolioRow {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub project_id: Option<i64>,
    pub published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub published: bool,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TestimonialRow {
    pub id: i64,
    pub author_name: String,
    pub quote: String,
    pub rating: i32,
    pub project_id: Option<i64>,
    pub approved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Manually parses the URL so usernames containing dots (managed-Postgres
    /// pooler conventions) survive intact — sqlx's built-in parser truncates
    /// them.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    ///
    /// Backs the `/readyz` readiness probe.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

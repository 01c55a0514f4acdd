//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization.
static SCHEMA_INIT: Once = Once::new();

/// Ensure the test database schema is set up (runs the migration once per
/// test suite) and a JWT secret is available for login tests.
pub fn ensure_schema() {
    SCHEMA_INIT.call_once(|| {
        std::env::set_var("SITEBEAM_JWT_SECRET", "integration-test-secret");
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = sqlx::PgPool::connect(&test_db_url()).await.unwrap();
            let sql = std::fs::read_to_string("migrations/001_schema.sql").unwrap();
            sqlx::raw_sql(&sql).execute(&pool).await.unwrap_or_else(|e| {
                panic!("Schema migration failed: {}", e);
            });
        });
    });
}

/// Connect to the test database (also ensures schema is set up).
pub async fn setup_test_db() -> sitebeam::db::Database {
    ensure_schema();
    let db = sitebeam::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Build an Axum test app router connected to the test database, with one
/// account per role already seeded (see [`seed_users`] for credentials).
pub async fn build_test_app() -> axum::Router {
    let db = setup_test_db().await;
    seed_users(&db).await;
    let state = sitebeam::dashboard::AppState::with_db(db);
    sitebeam::dashboard::build_router(state, None)
}

/// Truncate all tables to ensure test isolation.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql(
        "TRUNCATE TABLE testimonials, articles, portfolio_entries,
                       expenses, milestones, projects, user_profiles
         CASCADE",
    )
    .execute(pool)
    .await
    .unwrap();
}

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const FOREMAN_EMAIL: &str = "foreman@example.com";
pub const CLIENT_EMAIL: &str = "client@example.com";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Seed one account per role with a shared known password.
pub async fn seed_users(db: &sitebeam::db::Database) {
    for (email, role, name) in [
        (ADMIN_EMAIL, "admin", "Site Admin"),
        (FOREMAN_EMAIL, "foreman", "Lead Foreman"),
        (CLIENT_EMAIL, "client", "Homeowner"),
    ] {
        db.create_user(email, TEST_PASSWORD, role, Some(name))
            .await
            .expect("seed user");
    }
}

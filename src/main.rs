//! # Main — CLI Entry Point
//!
//! Routes subcommands to the dashboard server and operational tooling.
//!
//! ## Subcommands
//!
//! - `serve` — run the HTTP API (optionally fronting a static frontend build)
//! - `reconcile` — audit or repair project progress drift from the shell;
//!   the CLI mirror of the admin reconciliation API
//! - `create-user` — bootstrap accounts (the first admin has to come from
//!   somewhere)
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection string.
//! - `LOG_FORMAT=json`: structured JSON logs for container platforms.
//! - `SITEBEAM_JWT_SECRET`: HS256 signing key, required for logins.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use sitebeam::{dashboard, db, reconcile};

#[derive(Parser)]
#[command(name = "sitebeam", about = "Construction-project tracking backend")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 7010)]
        port: u16,
        /// Directory with a static frontend build to serve as fallback
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Audit or repair progress drift
    Reconcile {
        /// Limit to one project id (default: every project)
        #[arg(long)]
        project: Option<i64>,
        /// Persist the calculated values instead of only reporting
        #[arg(long)]
        fix: bool,
    },
    /// Create an account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// One of: admin, foreman, client
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // LOG_FORMAT=json for container platforms, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Commands::Serve { port, static_dir } => {
                dashboard::run(port, database_url, static_dir.as_deref()).await
            }
            Commands::Reconcile { project, fix } => {
                let database = db::Database::connect(database_url).await?;
                run_reconcile(&database, project, fix).await
            }
            Commands::CreateUser {
                email,
                password,
                role,
                name,
            } => {
                let database = db::Database::connect(database_url).await?;
                let profile = database
                    .create_user(&email, &password, &role, name.as_deref())
                    .await?;
                println!("created {} ({}) id={}", profile.email, profile.role, profile.id);
                Ok(())
            }
        }
    })
}

async fn run_reconcile(database: &db::Database, project: Option<i64>, fix: bool) -> Result<()> {
    match (project, fix) {
        (Some(id), false) => {
            let report = reconcile::progress_report(database, id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("project {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        (Some(id), true) => {
            let outcome = reconcile::repair_project(database, id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("project {} not found", id))?;
            info!(
                project_id = id,
                before_progress = outcome.before.progress,
                after_progress = outcome.after.progress,
                "repaired"
            );
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        (None, false) => {
            let reports = reconcile::reports_needing_update(database).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
            info!(count = reports.len(), "projects with drift");
        }
        (None, true) => {
            let batch = reconcile::repair_all(database).await?;
            println!(
                "fixed {} of {} projects examined",
                batch.fixed_count, batch.total_examined
            );
        }
    }
    Ok(())
}

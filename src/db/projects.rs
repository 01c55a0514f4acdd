//! Project queries — CRUD, role-scoped lists, manual progress, and the
//! reconciled write used by repair mode.
//!
//! `progress` and `status` are denormalized from the milestone set and can
//! drift; see `crate::reconcile`. The manual progress path deliberately
//! skips reconciliation — a foreman's slider value is accepted as-is and
//! stands until the next reconcile pass.

use anyhow::Result;

use super::{Database, ProjectRow, ProjectScope};
use crate::reconcile::{MilestoneTally, ProjectStatus};

const PROJECT_COLUMNS: &str = "id, name, description, progress, status, client_id, foreman_id,
                               started_at, completed_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProjectTallyRow {
    id: i64,
    name: String,
    progress: i32,
    status: String,
    completed: i64,
    cancelled: i64,
    in_progress: i64,
    not_started: i64,
}

impl Database {
    /// Create a project. New projects start at 0% in planning.
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        client_id: Option<uuid::Uuid>,
        foreman_id: Option<uuid::Uuid>,
    ) -> Result<ProjectRow> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "INSERT INTO projects (name, description, client_id, foreman_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(client_id)
        .bind(foreman_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// List projects visible to the caller, newest first.
    pub async fn get_projects(&self, scope: ProjectScope) -> Result<Vec<ProjectRow>> {
        let rows = match scope {
            ProjectScope::All => {
                sqlx::query_as::<_, ProjectRow>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
                ))
                .fetch_all(self.pool())
                .await?
            }
            ProjectScope::Foreman(id) => {
                sqlx::query_as::<_, ProjectRow>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE foreman_id = $1 ORDER BY created_at DESC"
                ))
                .bind(id)
                .fetch_all(self.pool())
                .await?
            }
            ProjectScope::Client(id) => {
                sqlx::query_as::<_, ProjectRow>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE client_id = $1 ORDER BY created_at DESC"
                ))
                .bind(id)
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(rows)
    }

    /// Get a single project by id.
    pub async fn get_project(&self, project_id: i64) -> Result<Option<ProjectRow>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(project_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Whether the caller's scope covers this project. Used by handlers to
    /// turn out-of-scope reads into 404s rather than leaking existence.
    pub fn project_in_scope(project: &ProjectRow, scope: ProjectScope) -> bool {
        match scope {
            ProjectScope::All => true,
            ProjectScope::Foreman(id) => project.foreman_id == Some(id),
            ProjectScope::Client(id) => project.client_id == Some(id),
        }
    }

    /// Update name/description/assignments. Returns the fresh row, or `None`
    /// when the project is unknown.
    pub async fn update_project(
        &self,
        project_id: i64,
        name: &str,
        description: Option<&str>,
        client_id: Option<uuid::Uuid>,
        foreman_id: Option<uuid::Uuid>,
    ) -> Result<Option<ProjectRow>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "UPDATE projects
             SET name = $2, description = $3, client_id = $4, foreman_id = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(client_id)
        .bind(foreman_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Manual override: persist a foreman-set progress value as-is.
    /// No reconciliation happens here; drift stands until the next pass.
    pub async fn set_manual_progress(&self, project_id: i64, progress: i32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE projects SET progress = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(project_id)
        .bind(progress)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist reconciled progress and status in one statement.
    ///
    /// The completion timestamp rides along: stamped on transition to
    /// completed (kept if already set), cleared otherwise. Single UPDATE, so
    /// the triple either fully applies or the row is untouched.
    pub async fn apply_reconciled(
        &self,
        project_id: i64,
        progress: i32,
        status: ProjectStatus,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE projects
             SET progress = $2,
                 status = $3,
                 completed_at = CASE WHEN $3 = 'completed'
                                     THEN COALESCE(completed_at, NOW())
                                     ELSE NULL END,
                 started_at = CASE WHEN $3 = 'in_progress'
                                   THEN COALESCE(started_at, NOW())
                                   ELSE started_at END,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(project_id)
        .bind(progress)
        .bind(status.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Delete a project and its milestones/expenses (cascade).
    pub async fn delete_project(&self, project_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every project with its milestone status counts, for batch audit and
    /// repair. LEFT JOIN keeps zero-milestone projects in the result.
    pub async fn projects_with_milestone_tallies(
        &self,
    ) -> Result<Vec<(i64, String, i32, String, MilestoneTally)>> {
        let rows = sqlx::query_as::<_, ProjectTallyRow>(
            "SELECT p.id, p.name, p.progress, p.status,
                    COUNT(m.id) FILTER (WHERE m.status = 'completed')   AS completed,
                    COUNT(m.id) FILTER (WHERE m.status = 'cancelled')   AS cancelled,
                    COUNT(m.id) FILTER (WHERE m.status = 'in_progress') AS in_progress,
                    COUNT(m.id) FILTER (WHERE m.status = 'not_started') AS not_started
             FROM projects p
             LEFT JOIN milestones m ON m.project_id = p.id
             GROUP BY p.id
             ORDER BY p.id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    r.name,
                    r.progress,
                    r.status,
                    MilestoneTally {
                        completed: r.completed,
                        cancelled: r.cancelled,
                        in_progress: r.in_progress,
                        not_started: r.not_started,
                    },
                )
            })
            .collect())
    }
}

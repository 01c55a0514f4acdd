//! Milestone queries — CRUD per project and the status-count aggregate
//! consumed by the progress reconciler.

use anyhow::Result;

use super::{Database, MilestoneRow};
use crate::reconcile::{MilestoneStatus, MilestoneTally};

const MILESTONE_COLUMNS: &str =
    "id, project_id, name, description, target_date, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TallyRow {
    completed: i64,
    cancelled: i64,
    in_progress: i64,
    not_started: i64,
}

impl Database {
    /// Create a milestone under a project. New milestones start not_started.
    pub async fn create_milestone(
        &self,
        project_id: i64,
        name: &str,
        description: Option<&str>,
        target_date: Option<chrono::NaiveDate>,
    ) -> Result<MilestoneRow> {
        let row = sqlx::query_as::<_, MilestoneRow>(&format!(
            "INSERT INTO milestones (project_id, name, description, target_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {MILESTONE_COLUMNS}"
        ))
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(target_date)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// All milestones for a project, ordered by target date then id.
    pub async fn get_milestones(&self, project_id: i64) -> Result<Vec<MilestoneRow>> {
        let rows = sqlx::query_as::<_, MilestoneRow>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones
             WHERE project_id = $1
             ORDER BY target_date NULLS LAST, id"
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Get a single milestone by id.
    pub async fn get_milestone(&self, milestone_id: i64) -> Result<Option<MilestoneRow>> {
        let row = sqlx::query_as::<_, MilestoneRow>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = $1"
        ))
        .bind(milestone_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Update a milestone's fields and status. Returns the fresh row, or
    /// `None` when the milestone is unknown.
    pub async fn update_milestone(
        &self,
        milestone_id: i64,
        name: &str,
        description: Option<&str>,
        target_date: Option<chrono::NaiveDate>,
        status: MilestoneStatus,
    ) -> Result<Option<MilestoneRow>> {
        let row = sqlx::query_as::<_, MilestoneRow>(&format!(
            "UPDATE milestones
             SET name = $2, description = $3, target_date = $4, status = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {MILESTONE_COLUMNS}"
        ))
        .bind(milestone_id)
        .bind(name)
        .bind(description)
        .bind(target_date)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Delete a milestone. Returns its project id so the caller can
    /// reconcile the parent, or `None` when the milestone is unknown.
    pub async fn delete_milestone(&self, milestone_id: i64) -> Result<Option<i64>> {
        let project_id = sqlx::query_scalar::<_, i64>(
            "DELETE FROM milestones WHERE id = $1 RETURNING project_id",
        )
        .bind(milestone_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(project_id)
    }

    /// Status counts for one project's milestones. Fresh read every call —
    /// the reconciler depends on this being current at compute time.
    pub async fn milestone_tally(&self, project_id: i64) -> Result<MilestoneTally> {
        let row = sqlx::query_as::<_, TallyRow>(
            "SELECT COUNT(*) FILTER (WHERE status = 'completed')   AS completed,
                    COUNT(*) FILTER (WHERE status = 'cancelled')   AS cancelled,
                    COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
                    COUNT(*) FILTER (WHERE status = 'not_started') AS not_started
             FROM milestones WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(self.pool())
        .await?;
        Ok(MilestoneTally {
            completed: row.completed,
            cancelled: row.cancelled,
            in_progress: row.in_progress,
            not_started: row.not_started,
        })
    }
}

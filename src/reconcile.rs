//! # Progress Reconciliation
//!
//! A project's persisted `progress` and `status` are denormalized copies of
//! what its milestones imply. They drift: foremen drag the progress slider,
//! admins edit status directly, milestone changes land without a reconcile
//! pass. This module computes the milestone-derived truth and reports or
//! repairs the drift.
//!
//! The derivation itself is a pure function over milestone status counts
//! ([`derive`]). The storage-aware wrappers ([`progress_report`],
//! [`repair_project`], [`repair_all`]) read fresh counts immediately before
//! computing and never commit partial state: a repair is a single UPDATE
//! carrying progress, status, and completion timestamp together.
//!
//! ## Status derivation
//!
//! Cancelled milestones are excluded from the denominator entirely. With
//! `effective = total - cancelled`:
//!
//! 1. `effective > 0` and all effective milestones completed → `Completed`
//! 2. every milestone cancelled (and at least one exists) → `Cancelled`
//! 3. nothing completed and nothing in progress → `Planning`
//! 4. otherwise → `InProgress`
//!
//! A project with zero milestones classifies as `Planning`: the Cancelled
//! branch requires `total > 0`, otherwise `cancelled == total` would match
//! vacuously and the classification would depend on branch order.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::Database;

/// Milestone lifecycle states, stored as snake_case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::NotStarted => "not_started",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status string. Unknown values are `None` — the schema
    /// constrains the column, so this only fails on hand-edited rows.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(MilestoneStatus::NotStarted),
            "in_progress" => Some(MilestoneStatus::InProgress),
            "completed" => Some(MilestoneStatus::Completed),
            "cancelled" => Some(MilestoneStatus::Cancelled),
            _ => None,
        }
    }
}

/// Project lifecycle states, stored as snake_case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(ProjectStatus::Planning),
            "in_progress" => Some(ProjectStatus::InProgress),
            "completed" => Some(ProjectStatus::Completed),
            "cancelled" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }
}

/// Milestone status counts for one project. The aggregate query in
/// `db::milestones` produces this directly; [`MilestoneTally::from_statuses`]
/// exists for in-memory callers and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MilestoneTally {
    pub completed: i64,
    pub cancelled: i64,
    pub in_progress: i64,
    pub not_started: i64,
}

impl MilestoneTally {
    pub fn from_statuses<I: IntoIterator<Item = MilestoneStatus>>(statuses: I) -> Self {
        let mut tally = MilestoneTally::default();
        for status in statuses {
            match status {
                MilestoneStatus::Completed => tally.completed += 1,
                MilestoneStatus::Cancelled => tally.cancelled += 1,
                MilestoneStatus::InProgress => tally.in_progress += 1,
                MilestoneStatus::NotStarted => tally.not_started += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> i64 {
        self.completed + self.cancelled + self.in_progress + self.not_started
    }

    /// Denominator for the progress percentage: cancelled milestones are
    /// excluded entirely.
    pub fn effective_total(&self) -> i64 {
        self.total() - self.cancelled
    }
}

/// Result of the pure derivation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Derived {
    pub progress: i32,
    pub status: ProjectStatus,
}

/// Derive a project's progress percentage and lifecycle status from its
/// milestone counts.
///
/// Progress is `round_half_up(completed / effective_total * 100)`, or 0 when
/// the effective total is 0 (empty project or everything cancelled).
pub fn derive(tally: &MilestoneTally) -> Derived {
    let effective = tally.effective_total();
    let progress = if effective > 0 {
        (tally.completed as f64 / effective as f64 * 100.0).round() as i32
    } else {
        0
    };

    let status = if effective > 0 && tally.completed == effective {
        ProjectStatus::Completed
    } else if tally.total() > 0 && tally.cancelled == tally.total() {
        ProjectStatus::Cancelled
    } else if tally.completed == 0 && tally.in_progress == 0 {
        ProjectStatus::Planning
    } else {
        ProjectStatus::InProgress
    };

    Derived { progress, status }
}

/// Audit view of one project: persisted values vs. what the milestones imply.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub project_id: i64,
    pub project_name: String,
    pub current_progress: i32,
    pub current_status: String,
    pub calculated_progress: i32,
    pub calculated_status: ProjectStatus,
    pub needs_update: bool,
    pub milestone_breakdown: MilestoneTally,
}

impl ProgressReport {
    fn build(
        project_id: i64,
        name: String,
        progress: i32,
        status: String,
        tally: MilestoneTally,
    ) -> Self {
        let derived = derive(&tally);
        let needs_update = progress != derived.progress || status != derived.status.as_str();
        ProgressReport {
            project_id,
            project_name: name,
            current_progress: progress,
            current_status: status,
            calculated_progress: derived.progress,
            calculated_status: derived.status,
            needs_update,
            milestone_breakdown: tally,
        }
    }
}

/// `(progress, status)` pair before or after a repair.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub progress: i32,
    pub status: String,
}

/// Before/after view returned by [`repair_project`].
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub project_id: i64,
    pub before: Snapshot,
    pub after: Snapshot,
}

/// Tally of a batch repair pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchRepair {
    pub fixed_count: usize,
    pub total_examined: usize,
}

/// Report mode: compute the derived values for one project without writing.
/// Returns `None` when the project does not exist.
pub async fn progress_report(db: &Database, project_id: i64) -> Result<Option<ProgressReport>> {
    let Some(project) = db.get_project(project_id).await? else {
        return Ok(None);
    };
    let tally = db.milestone_tally(project_id).await?;
    Ok(Some(ProgressReport::build(
        project.id,
        project.name,
        project.progress,
        project.status,
        tally,
    )))
}

/// Reports for every project whose persisted values drifted from the
/// milestone-derived ones.
pub async fn reports_needing_update(db: &Database) -> Result<Vec<ProgressReport>> {
    let reports = all_reports(db).await?;
    Ok(reports.into_iter().filter(|r| r.needs_update).collect())
}

/// Count of drifted projects, for the background audit gauge.
pub async fn count_needing_update(db: &Database) -> Result<usize> {
    Ok(reports_needing_update(db).await?.len())
}

async fn all_reports(db: &Database) -> Result<Vec<ProgressReport>> {
    let rows = db.projects_with_milestone_tallies().await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, progress, status, tally)| {
            ProgressReport::build(id, name, progress, status, tally)
        })
        .collect())
}

/// Repair mode: persist the derived progress and status onto the project.
///
/// Stamps `completed_at` when the project transitions to Completed without a
/// timestamp, and clears it when the new status is anything else. The write
/// is a single UPDATE, so a failure leaves the row untouched. Returns `None`
/// when the project does not exist.
pub async fn repair_project(db: &Database, project_id: i64) -> Result<Option<RepairOutcome>> {
    let Some(project) = db.get_project(project_id).await? else {
        return Ok(None);
    };
    let tally = db.milestone_tally(project_id).await?;
    let derived = derive(&tally);

    let before = Snapshot {
        progress: project.progress,
        status: project.status.clone(),
    };
    db.apply_reconciled(project_id, derived.progress, derived.status)
        .await?;

    Ok(Some(RepairOutcome {
        project_id,
        before,
        after: Snapshot {
            progress: derived.progress,
            status: derived.status.as_str().to_string(),
        },
    }))
}

/// Batch repair: fix every project whose report shows drift.
///
/// Sequential by design. A project whose repair fails is logged, skipped,
/// and excluded from `fixed_count`; the rest of the batch proceeds.
pub async fn repair_all(db: &Database) -> Result<BatchRepair> {
    let reports = all_reports(db).await?;
    let total_examined = reports.len();
    let mut fixed_count = 0;

    for report in reports.into_iter().filter(|r| r.needs_update) {
        match repair_project(db, report.project_id).await {
            Ok(Some(_)) => fixed_count += 1,
            // Deleted between the list read and the repair read; skip.
            Ok(None) => {}
            Err(e) => {
                warn!(project_id = report.project_id, error = %e, "repair failed, skipping");
            }
        }
    }

    Ok(BatchRepair {
        fixed_count,
        total_examined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use MilestoneStatus::*;

    fn tally(statuses: &[MilestoneStatus]) -> MilestoneTally {
        MilestoneTally::from_statuses(statuses.iter().copied())
    }

    #[test]
    fn half_completed_half_pending_is_in_progress_at_50() {
        // 4 milestones: 2 completed, 1 in progress, 1 not started
        let d = derive(&tally(&[Completed, Completed, InProgress, NotStarted]));
        assert_eq!(d.progress, 50);
        assert_eq!(d.status, ProjectStatus::InProgress);
    }

    #[test]
    fn cancelled_milestones_leave_the_denominator() {
        // 2 of 2 effective milestones done; the cancelled one doesn't count
        let d = derive(&tally(&[Completed, Completed, Cancelled]));
        assert_eq!(d.progress, 100);
        assert_eq!(d.status, ProjectStatus::Completed);
    }

    #[test]
    fn empty_project_is_planning_at_zero() {
        let d = derive(&MilestoneTally::default());
        assert_eq!(d.progress, 0);
        assert_eq!(d.status, ProjectStatus::Planning);
    }

    #[test]
    fn all_cancelled_is_cancelled_at_zero() {
        let d = derive(&tally(&[Cancelled, Cancelled]));
        assert_eq!(d.progress, 0);
        assert_eq!(d.status, ProjectStatus::Cancelled);
    }

    #[test]
    fn untouched_milestones_mean_planning() {
        let d = derive(&tally(&[NotStarted, NotStarted, NotStarted]));
        assert_eq!(d.progress, 0);
        assert_eq!(d.status, ProjectStatus::Planning);
    }

    #[test]
    fn cancelled_plus_not_started_is_still_planning() {
        // One milestone cancelled, one untouched: not all cancelled, nothing
        // completed or running
        let d = derive(&tally(&[Cancelled, NotStarted]));
        assert_eq!(d.progress, 0);
        assert_eq!(d.status, ProjectStatus::Planning);
    }

    #[test]
    fn rounding_is_half_up() {
        // 1/3 = 33.33 → 33; 2/3 = 66.67 → 67; 1/8 = 12.5 → 13
        let d = derive(&tally(&[Completed, NotStarted, NotStarted]));
        assert_eq!(d.progress, 33);
        let d = derive(&tally(&[Completed, Completed, NotStarted]));
        assert_eq!(d.progress, 67);
        let statuses: Vec<_> = std::iter::once(Completed)
            .chain(std::iter::repeat(NotStarted).take(7))
            .collect();
        let d = derive(&tally(&statuses));
        assert_eq!(d.progress, 13);
    }

    #[test]
    fn completed_wins_regardless_of_other_counts() {
        // All effective milestones completed → Completed, even with
        // cancelled ones present
        let d = derive(&tally(&[Completed, Cancelled, Cancelled]));
        assert_eq!(d.status, ProjectStatus::Completed);
        assert_eq!(d.progress, 100);
    }

    #[test]
    fn report_flags_drift_on_progress_or_status() {
        let t = tally(&[Completed, Completed]);
        let r = ProgressReport::build(1, "Hangar".into(), 40, "in_progress".into(), t);
        assert!(r.needs_update);
        assert_eq!(r.calculated_progress, 100);
        assert_eq!(r.calculated_status, ProjectStatus::Completed);

        let r = ProgressReport::build(1, "Hangar".into(), 100, "completed".into(), t);
        assert!(!r.needs_update);
    }

    #[test]
    fn report_flags_status_only_drift() {
        // Progress happens to match but the status string is stale
        let t = tally(&[Completed, NotStarted]);
        let r = ProgressReport::build(2, "Depot".into(), 50, "planning".into(), t);
        assert!(r.needs_update);
        assert_eq!(r.calculated_status, ProjectStatus::InProgress);
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for s in [
            ProjectStatus::Planning,
            ProjectStatus::InProgress,
            ProjectStatus::Completed,
            ProjectStatus::Cancelled,
        ] {
            assert_eq!(ProjectStatus::parse(s.as_str()), Some(s));
        }
        for s in [NotStarted, InProgress, Completed, Cancelled] {
            assert_eq!(MilestoneStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ProjectStatus::parse("paused"), None);
        assert_eq!(MilestoneStatus::parse(""), None);
    }
}

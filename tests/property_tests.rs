//! Property-based tests for the progress derivation rules.
//!
//! These tests use the `proptest` framework to verify invariants of the
//! milestone-to-progress derivation across thousands of randomly generated
//! tallies. Unlike the example-based unit tests, they express truths that
//! must hold for every possible milestone distribution.
//!
//! # Prerequisites
//!
//! - No database or network access required.
//! - These tests are purely computational and always run.
//!
//! # How to run
//!
//! ```bash
//! # Run all property tests:
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```
//!
//! # Testing strategy
//!
//! Each property is named `prop_<aspect>_<invariant>`. The derivation is a
//! pure function of four counts, so strategies just generate counts in
//! 0..=50; that covers empty projects, all-cancelled projects, and every
//! mixed distribution a real project could have.

use proptest::prelude::*;

use sitebeam::reconcile::{derive, MilestoneStatus, MilestoneTally, ProjectStatus};

fn arb_tally() -> impl Strategy<Value = MilestoneTally> {
    (0i64..=50, 0i64..=50, 0i64..=50, 0i64..=50).prop_map(
        |(completed, cancelled, in_progress, not_started)| MilestoneTally {
            completed,
            cancelled,
            in_progress,
            not_started,
        },
    )
}

fn arb_status() -> impl Strategy<Value = MilestoneStatus> {
    prop_oneof![
        Just(MilestoneStatus::NotStarted),
        Just(MilestoneStatus::InProgress),
        Just(MilestoneStatus::Completed),
        Just(MilestoneStatus::Cancelled),
    ]
}

proptest! {
    /// Progress is always a percentage: 0..=100 for any tally.
    #[test]
    fn prop_progress_is_bounded(tally in arb_tally()) {
        let d = derive(&tally);
        prop_assert!((0..=100).contains(&d.progress),
            "progress {} out of range for {:?}", d.progress, tally);
    }

    /// An empty effective set (no milestones, or everything cancelled)
    /// always derives 0%.
    #[test]
    fn prop_zero_effective_means_zero_progress(cancelled in 0i64..=50) {
        let tally = MilestoneTally { cancelled, ..MilestoneTally::default() };
        let d = derive(&tally);
        prop_assert_eq!(d.progress, 0);
    }

    /// Completed status appears exactly when every effective milestone is
    /// completed and at least one exists; and then progress is 100.
    #[test]
    fn prop_completed_iff_all_effective_done(tally in arb_tally()) {
        let d = derive(&tally);
        let effective = tally.effective_total();
        let all_done = effective > 0 && tally.completed == effective;
        prop_assert_eq!(d.status == ProjectStatus::Completed, all_done);
        if all_done {
            prop_assert_eq!(d.progress, 100);
        }
    }

    /// Cancelled status appears exactly when milestones exist and every one
    /// of them is cancelled.
    #[test]
    fn prop_cancelled_iff_every_milestone_cancelled(tally in arb_tally()) {
        let d = derive(&tally);
        let all_cancelled = tally.total() > 0 && tally.cancelled == tally.total();
        prop_assert_eq!(d.status == ProjectStatus::Cancelled, all_cancelled);
    }

    /// Cancelled milestones never change the percentage — only the other
    /// three counts feed the ratio.
    #[test]
    fn prop_progress_ignores_cancelled_count(tally in arb_tally()) {
        let without = MilestoneTally { cancelled: 0, ..tally };
        prop_assert_eq!(derive(&tally).progress, derive(&without).progress);
    }

    /// Completing one more milestone (from not_started) never lowers the
    /// percentage.
    #[test]
    fn prop_completing_a_milestone_is_monotonic(tally in arb_tally()) {
        prop_assume!(tally.not_started > 0);
        let after = MilestoneTally {
            completed: tally.completed + 1,
            not_started: tally.not_started - 1,
            ..tally
        };
        prop_assert!(derive(&after).progress >= derive(&tally).progress);
    }

    /// Deriving twice from the same tally is stable, and a project whose
    /// persisted values already match the derivation has nothing to repair.
    #[test]
    fn prop_derivation_is_deterministic(tally in arb_tally()) {
        let first = derive(&tally);
        let second = derive(&tally);
        prop_assert_eq!(first, second);
    }

    /// Building a tally from a milestone list preserves the list length and
    /// counts each status exactly once.
    #[test]
    fn prop_tally_counts_partition_the_list(statuses in prop::collection::vec(arb_status(), 0..100)) {
        let tally = MilestoneTally::from_statuses(statuses.iter().copied());
        prop_assert_eq!(tally.total(), statuses.len() as i64);
        let completed = statuses.iter().filter(|s| **s == MilestoneStatus::Completed).count();
        prop_assert_eq!(tally.completed, completed as i64);
    }

    /// Status strings written to storage parse back to the same status.
    #[test]
    fn prop_status_strings_roundtrip(status in arb_status()) {
        prop_assert_eq!(MilestoneStatus::parse(status.as_str()), Some(status));
    }
}

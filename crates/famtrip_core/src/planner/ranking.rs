//! Display ranking for planner activity lists.
//!
//! # Responsibility
//! - Own the single comparator used to order activities for display.
//!
//! # Invariants
//! - Activities with at least one yes vote precede those without.
//! - Then scheduled before unscheduled, earlier schedule first.
//! - Unscheduled activities are ordered newest-created first.
//! - Remaining ties keep input order (stable sort).
//! - Ranking never mutates its input.

use crate::model::activity::Activity;
use std::cmp::Ordering;

/// Compares two activities by display priority.
///
/// `Ordering::Less` means `a` is shown before `b`.
pub fn compare_for_ranking(a: &Activity, b: &Activity) -> Ordering {
    // `true` sorts first, hence the reversed operands.
    b.has_yes_vote()
        .cmp(&a.has_yes_vote())
        .then_with(|| match (a.scheduled_time, b.scheduled_time) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        })
}

/// Returns a new list with the same activities in display order.
pub fn rank_activities(activities: &[Activity]) -> Vec<Activity> {
    let mut ranked = activities.to_vec();
    rank_in_place(&mut ranked);
    ranked
}

/// Orders `activities` for display in place.
///
/// `sort_by` is stable, which keeps input order for full ties.
pub fn rank_in_place(activities: &mut [Activity]) {
    activities.sort_by(compare_for_ranking);
}

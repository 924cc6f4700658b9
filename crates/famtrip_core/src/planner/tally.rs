//! Vote aggregation for one activity.

use crate::model::activity::{Activity, VoteType};

/// Aggregate vote counts and participation ratio for display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoteTally {
    pub yes_count: u32,
    pub no_count: u32,
    pub maybe_count: u32,
    /// Number of members with any vote.
    pub total_voters: u32,
    /// `yes_count / total_voters`, `0.0` when nobody voted.
    pub yes_ratio: f64,
}

impl VoteTally {
    /// Returns the count for one vote category.
    pub fn count_for(&self, vote: VoteType) -> u32 {
        match vote {
            VoteType::Yes => self.yes_count,
            VoteType::No => self.no_count,
            VoteType::Maybe => self.maybe_count,
        }
    }
}

/// Counts votes per category for `activity`.
pub fn tally_votes(activity: &Activity) -> VoteTally {
    let mut tally = VoteTally::default();
    for vote in activity.votes.values() {
        match vote {
            VoteType::Yes => tally.yes_count += 1,
            VoteType::No => tally.no_count += 1,
            VoteType::Maybe => tally.maybe_count += 1,
        }
    }
    tally.total_voters = tally.yes_count + tally.no_count + tally.maybe_count;
    if tally.total_voters > 0 {
        tally.yes_ratio = f64::from(tally.yes_count) / f64::from(tally.total_voters);
    }
    tally
}

/// Returns the members that voted `vote`, in member-id order.
pub fn voters_for(activity: &Activity, vote: VoteType) -> Vec<&str> {
    activity
        .votes
        .iter()
        .filter(|(_, cast)| **cast == vote)
        .map(|(member, _)| member.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{tally_votes, voters_for};
    use crate::model::activity::{Activity, VoteType};

    #[test]
    fn unvoted_activity_has_zero_ratio() {
        let tally = tally_votes(&Activity::new("fam", "museum", 0));
        assert_eq!(tally.total_voters, 0);
        assert_eq!(tally.yes_ratio, 0.0);
    }

    #[test]
    fn one_vote_per_category() {
        let mut activity = Activity::new("fam", "hike", 0);
        activity.cast_vote("u1", VoteType::Yes);
        activity.cast_vote("u2", VoteType::No);
        activity.cast_vote("u3", VoteType::Maybe);

        let tally = tally_votes(&activity);
        assert_eq!(tally.yes_count, 1);
        assert_eq!(tally.no_count, 1);
        assert_eq!(tally.maybe_count, 1);
        assert_eq!(tally.total_voters, 3);
        assert!((tally.yes_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(tally.count_for(VoteType::Maybe), 1);
    }

    #[test]
    fn counts_always_sum_to_total_and_ratio_stays_in_range() {
        let mut activity = Activity::new("fam", "zoo", 0);
        for (index, vote) in [
            VoteType::Yes,
            VoteType::Yes,
            VoteType::No,
            VoteType::Yes,
            VoteType::Maybe,
        ]
        .into_iter()
        .enumerate()
        {
            activity.cast_vote(format!("member-{index}"), vote);
            let tally = tally_votes(&activity);
            assert_eq!(
                tally.yes_count + tally.no_count + tally.maybe_count,
                tally.total_voters
            );
            assert_eq!(tally.total_voters as usize, activity.votes.len());
            assert!((0.0..=1.0).contains(&tally.yes_ratio));
        }
    }

    #[test]
    fn revote_replaces_previous_vote() {
        let mut activity = Activity::new("fam", "picnic", 0);
        activity.cast_vote("u1", VoteType::No);
        activity.cast_vote("u1", VoteType::Yes);

        let tally = tally_votes(&activity);
        assert_eq!(tally.total_voters, 1);
        assert_eq!(tally.yes_count, 1);
        assert_eq!(tally.no_count, 0);
        assert_eq!(tally.yes_ratio, 1.0);
    }

    #[test]
    fn voters_for_lists_matching_members_only() {
        let mut activity = Activity::new("fam", "boat", 0);
        activity.cast_vote("zoe", VoteType::Yes);
        activity.cast_vote("ann", VoteType::Yes);
        activity.cast_vote("bob", VoteType::No);

        assert_eq!(voters_for(&activity, VoteType::Yes), vec!["ann", "zoe"]);
        assert!(voters_for(&activity, VoteType::Maybe).is_empty());
    }
}

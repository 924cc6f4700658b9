//! Activity planner use-case service.
//!
//! # Responsibility
//! - Provide create/vote/status/board entry points for core callers.
//! - Combine stored activities with the ranking and tally rules.
//!
//! # Invariants
//! - Every board goes through `rank_activities` and `tally_votes`; callers
//!   never re-implement ordering or counting.
//! - Status changes follow `ActivityStatus::can_transition_to`.
//! - `created_at` is stamped once here and never rewritten.

use crate::model::activity::{Activity, ActivityId, ActivityStatus, MemberId, VoteType};
use crate::planner::ranking::rank_activities;
use crate::planner::tally::{tally_votes, VoteTally};
use crate::repo::activity_repo::{ActivityRepository, RepoError, RepoResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Service error for planner use-cases.
#[derive(Debug)]
pub enum PlannerServiceError {
    /// Title is blank after whitespace normalization.
    InvalidTitle,
    /// Member id is blank.
    InvalidMember,
    /// Target activity does not exist.
    ActivityNotFound(ActivityId),
    /// Requested lifecycle move is not allowed.
    InvalidTransition {
        activity_id: ActivityId,
        from: ActivityStatus,
        to: ActivityStatus,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for PlannerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "activity title must not be blank"),
            Self::InvalidMember => write!(f, "member id must not be blank"),
            Self::ActivityNotFound(id) => write!(f, "activity not found: {id}"),
            Self::InvalidTransition {
                activity_id,
                from,
                to,
            } => write!(
                f,
                "activity {activity_id} cannot move from {} to {}",
                from.as_wire(),
                to.as_wire()
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent planner state: {details}")
            }
        }
    }
}

impl Error for PlannerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PlannerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ActivityNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerServiceError>;

/// Request model for proposing a new activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateActivityRequest {
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub scheduled_time: Option<i64>,
    /// When set, the proposer is recorded as voting yes.
    pub created_by: Option<MemberId>,
}

/// One ranked board row: the activity plus its vote tally.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerEntry {
    pub activity: Activity,
    pub tally: VoteTally,
}

/// Ranked planner board for one family group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerBoard {
    /// Entries in display order.
    pub entries: Vec<PlannerEntry>,
    /// Stored records excluded as malformed.
    pub rejected_count: usize,
}

/// Planner service facade over repository implementations.
pub struct PlannerService<R: ActivityRepository> {
    repo: R,
}

impl<R: ActivityRepository> PlannerService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one planned activity stamped with the current time.
    pub fn create_activity(&mut self, request: CreateActivityRequest) -> PlannerResult<Activity> {
        self.create_activity_at(request, now_epoch_ms())
    }

    /// Creates one planned activity with an explicit creation time.
    ///
    /// # Contract
    /// - Title whitespace is collapsed and trimmed.
    /// - Status starts as `Planned`.
    /// - `created_by`, when present, is stored as a yes vote.
    pub fn create_activity_at(
        &mut self,
        request: CreateActivityRequest,
        created_at: i64,
    ) -> PlannerResult<Activity> {
        let title = normalize_title(&request.title).ok_or(PlannerServiceError::InvalidTitle)?;
        let mut activity = Activity::new(request.group_id, title, created_at);
        activity.description = request
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        activity.scheduled_time = request.scheduled_time;
        if let Some(member) = request.created_by {
            activity.cast_vote(require_member(&member)?, VoteType::Yes);
        }

        let id = self.repo.create_activity(&activity)?;
        info!(
            "event=activity_create module=planner status=ok activity_id={} scheduled={}",
            id,
            activity.scheduled_time.is_some()
        );
        self.repo
            .get_activity(id)?
            .ok_or(PlannerServiceError::InconsistentState(
                "created activity not found in read-back",
            ))
    }

    /// Stores fetched activities as-is (ids and timestamps kept).
    ///
    /// # Contract
    /// - All-or-nothing: a failing record leaves storage untouched.
    /// - Re-importing an already stored id replaces its fields and votes;
    ///   the stored `created_at` is kept.
    ///
    /// Returns the number of stored activities.
    pub fn import_activities(&mut self, activities: &[Activity]) -> PlannerResult<usize> {
        let count = self.repo.import_activities(activities)?;
        info!(
            "event=activity_import module=planner status=ok count={}",
            count
        );
        Ok(count)
    }

    /// Gets one activity by stable ID.
    pub fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        self.repo.get_activity(id)
    }

    /// Records `member`'s vote (last write wins) and returns the new tally.
    pub fn cast_vote(
        &self,
        id: ActivityId,
        member: &str,
        vote: VoteType,
    ) -> PlannerResult<VoteTally> {
        let member = require_member(member)?;
        self.repo.upsert_vote(id, member, vote)?;
        info!(
            "event=vote_cast module=planner status=ok activity_id={} vote={}",
            id,
            vote.as_wire()
        );
        self.tally_of(id)
    }

    /// Withdraws `member`'s vote and returns the new tally.
    pub fn clear_vote(&self, id: ActivityId, member: &str) -> PlannerResult<VoteTally> {
        let member = require_member(member)?;
        let removed = self.repo.remove_vote(id, member)?;
        info!(
            "event=vote_clear module=planner status=ok activity_id={} removed={}",
            id, removed
        );
        self.tally_of(id)
    }

    /// Moves an activity to `next` when the lifecycle allows it.
    pub fn advance_status(&self, id: ActivityId, next: ActivityStatus) -> PlannerResult<Activity> {
        let current = self.require_activity(id)?;
        if !current.status.can_transition_to(next) {
            return Err(PlannerServiceError::InvalidTransition {
                activity_id: id,
                from: current.status,
                to: next,
            });
        }
        if current.status == next {
            return Ok(current);
        }

        self.repo.update_status(id, next)?;
        info!(
            "event=activity_status module=planner status=ok activity_id={} from={} to={}",
            id,
            current.status.as_wire(),
            next.as_wire()
        );
        self.require_activity(id)
    }

    /// Sets or clears the scheduled time.
    pub fn reschedule(
        &self,
        id: ActivityId,
        scheduled_time: Option<i64>,
    ) -> PlannerResult<Activity> {
        let current = self.require_activity(id)?;
        self.repo.update_details(
            id,
            &current.title,
            current.description.as_deref(),
            scheduled_time,
        )?;
        self.require_activity(id)
    }

    /// Replaces title and description, keeping the schedule.
    pub fn rename(
        &self,
        id: ActivityId,
        title: &str,
        description: Option<&str>,
    ) -> PlannerResult<Activity> {
        let title = normalize_title(title).ok_or(PlannerServiceError::InvalidTitle)?;
        let description = description.map(str::trim).filter(|value| !value.is_empty());
        let current = self.require_activity(id)?;
        self.repo
            .update_details(id, &title, description, current.scheduled_time)?;
        self.require_activity(id)
    }

    /// Deletes an activity and its votes.
    pub fn delete_activity(&self, id: ActivityId) -> PlannerResult<()> {
        self.repo.delete_activity(id)?;
        info!(
            "event=activity_delete module=planner status=ok activity_id={}",
            id
        );
        Ok(())
    }

    /// Builds the ranked board with tallies for one family group.
    pub fn board(&self, group_id: &str) -> PlannerResult<PlannerBoard> {
        let listing = self.repo.list_group_activities(group_id)?;
        let entries = rank_activities(&listing.activities)
            .into_iter()
            .map(|activity| PlannerEntry {
                tally: tally_votes(&activity),
                activity,
            })
            .collect::<Vec<_>>();

        info!(
            "event=planner_board module=planner status=ok entries={} rejected={}",
            entries.len(),
            listing.rejected.len()
        );
        Ok(PlannerBoard {
            entries,
            rejected_count: listing.rejected.len(),
        })
    }

    fn tally_of(&self, id: ActivityId) -> PlannerResult<VoteTally> {
        let activity = self.require_activity(id)?;
        Ok(tally_votes(&activity))
    }

    fn require_activity(&self, id: ActivityId) -> PlannerResult<Activity> {
        self.repo
            .get_activity(id)?
            .ok_or(PlannerServiceError::ActivityNotFound(id))
    }
}

/// Collapses runs of whitespace and trims. Blank input yields `None`.
pub fn normalize_title(title: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(title, " ");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn require_member(member: &str) -> PlannerResult<&str> {
    let trimmed = member.trim();
    if trimmed.is_empty() {
        Err(PlannerServiceError::InvalidMember)
    } else {
        Ok(trimmed)
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

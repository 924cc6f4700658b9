//! Activity domain model.
//!
//! # Responsibility
//! - Define the canonical plannable activity shared by planner views.
//! - Own the per-member vote map and its last-write-wins mutation helpers.
//!
//! # Invariants
//! - `id` is stable, never nil and never reused for another activity.
//! - Each member holds at most one vote per activity.
//! - `created_at` is set once at creation and never rewritten.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one activity.
pub type ActivityId = Uuid;

/// Opaque family member identifier assigned by the auth provider.
pub type MemberId = String;

/// Opaque family group identifier assigned by the backing store.
pub type FamilyGroupId = String;

/// One member's stance on an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Yes,
    No,
    Maybe,
}

impl VoteType {
    /// All vote categories in display order.
    pub const ALL: [VoteType; 3] = [VoteType::Yes, VoteType::No, VoteType::Maybe];

    /// Stable lowercase wire/storage name.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Maybe => "maybe",
        }
    }

    /// Parses a wire/storage name. Unknown values return `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "maybe" => Some(Self::Maybe),
            _ => None,
        }
    }
}

/// Lifecycle state of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Proposed, collecting votes.
    Planned,
    /// Agreed on by the family.
    Confirmed,
    /// Took place.
    Completed,
    /// Dropped.
    Cancelled,
}

impl ActivityStatus {
    /// Stable lowercase wire/storage name.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a wire/storage name. Unknown values return `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(Self::Planned),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns whether `self -> next` is an allowed lifecycle move.
    ///
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(self, next: ActivityStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Planned => matches!(next, Self::Confirmed | Self::Cancelled),
            Self::Confirmed => matches!(next, Self::Planned | Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

/// Validation failures for activity invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityValidationError {
    NilId,
    BlankTitle,
    BlankGroupId,
    BlankMemberId,
}

impl Display for ActivityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "activity id must not be nil"),
            Self::BlankTitle => write!(f, "activity title must not be blank"),
            Self::BlankGroupId => write!(f, "family group id must not be blank"),
            Self::BlankMemberId => write!(f, "vote member id must not be blank"),
        }
    }
}

impl Error for ActivityValidationError {}

/// Plannable family activity with its vote map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    /// Family group that owns this activity.
    pub group_id: FamilyGroupId,
    pub title: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub scheduled_time: Option<i64>,
    /// Unix epoch milliseconds. Immutable after creation.
    pub created_at: i64,
    /// Member -> vote. Ordered map keeps serialization deterministic.
    pub votes: BTreeMap<MemberId, VoteType>,
    pub status: ActivityStatus,
}

impl Activity {
    /// Creates a planned activity with a generated stable ID.
    pub fn new(
        group_id: impl Into<FamilyGroupId>,
        title: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: group_id.into(),
            title: title.into(),
            description: None,
            scheduled_time: None,
            created_at,
            votes: BTreeMap::new(),
            status: ActivityStatus::Planned,
        }
    }

    /// Creates a planned activity with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: ActivityId,
        group_id: impl Into<FamilyGroupId>,
        title: impl Into<String>,
        created_at: i64,
    ) -> Result<Self, ActivityValidationError> {
        if id.is_nil() {
            return Err(ActivityValidationError::NilId);
        }
        let mut activity = Self::new(group_id, title, created_at);
        activity.id = id;
        Ok(activity)
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ActivityValidationError> {
        if self.id.is_nil() {
            return Err(ActivityValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ActivityValidationError::BlankTitle);
        }
        if self.group_id.trim().is_empty() {
            return Err(ActivityValidationError::BlankGroupId);
        }
        if self.votes.keys().any(|member| member.trim().is_empty()) {
            return Err(ActivityValidationError::BlankMemberId);
        }
        Ok(())
    }

    /// Records `member`'s vote, replacing any earlier vote (last write wins).
    ///
    /// Returns the replaced vote, if any.
    pub fn cast_vote(&mut self, member: impl Into<MemberId>, vote: VoteType) -> Option<VoteType> {
        self.votes.insert(member.into(), vote)
    }

    /// Removes `member`'s vote. Returns the removed vote, if any.
    pub fn clear_vote(&mut self, member: &str) -> Option<VoteType> {
        self.votes.remove(member)
    }

    /// Returns `member`'s current vote.
    pub fn vote_of(&self, member: &str) -> Option<VoteType> {
        self.votes.get(member).copied()
    }

    /// Returns whether at least one member voted yes.
    pub fn has_yes_vote(&self) -> bool {
        self.votes.values().any(|vote| *vote == VoteType::Yes)
    }
}

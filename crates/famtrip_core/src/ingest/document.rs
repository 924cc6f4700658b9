//! Document-store record ingestion.
//!
//! # Responsibility
//! - Convert loosely typed store documents into validated `Activity` values.
//! - Exclude malformed records from a batch without failing the batch.
//!
//! # Invariants
//! - Only known vote and status names are accepted.
//! - A rejected record never reaches planner logic.
//! - Rejection logs carry record ids and reasons, never titles or member ids.

use crate::model::activity::{Activity, ActivityStatus, FamilyGroupId, VoteType};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Activity document as stored by the hosted document database.
///
/// Enum-like fields stay strings here; they are checked during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDocument {
    pub id: String,
    pub group_id: FamilyGroupId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scheduled_time: Option<i64>,
    pub created_at: i64,
    #[serde(default)]
    pub votes: BTreeMap<String, String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    ActivityStatus::Planned.as_wire().to_string()
}

/// Errors from the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// One record is unusable and was excluded.
    MalformedRecord {
        /// Record id as received, or `#<index>` when it could not be read.
        record_id: String,
        reason: String,
    },
    /// The payload as a whole is not a list of records.
    InvalidPayload(String),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRecord { record_id, reason } => {
                write!(f, "malformed record `{record_id}`: {reason}")
            }
            Self::InvalidPayload(message) => write!(f, "invalid activity payload: {message}"),
        }
    }
}

impl Error for IngestError {}

impl IngestError {
    fn malformed(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }
}

/// Result of ingesting one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// Valid activities in input order.
    pub activities: Vec<Activity>,
    /// One entry per excluded record.
    pub rejected: Vec<IngestError>,
}

impl TryFrom<ActivityDocument> for Activity {
    type Error = IngestError;

    fn try_from(document: ActivityDocument) -> Result<Self, Self::Error> {
        let record_id = document.id.clone();
        let id = Uuid::parse_str(document.id.trim())
            .map_err(|_| IngestError::malformed(&record_id, "id is not a valid uuid"))?;

        let status = ActivityStatus::from_wire(&document.status).ok_or_else(|| {
            IngestError::malformed(&record_id, format!("unknown status `{}`", document.status))
        })?;

        let mut votes = BTreeMap::new();
        for (member, raw_vote) in document.votes {
            let vote = VoteType::from_wire(&raw_vote).ok_or_else(|| {
                IngestError::malformed(&record_id, format!("unknown vote value `{raw_vote}`"))
            })?;
            votes.insert(member, vote);
        }

        let activity = Activity {
            id,
            group_id: document.group_id,
            title: document.title,
            description: document.description,
            scheduled_time: document.scheduled_time,
            created_at: document.created_at,
            votes,
            status,
        };
        activity
            .validate()
            .map_err(|err| IngestError::malformed(&record_id, err.to_string()))?;
        Ok(activity)
    }
}

impl From<&Activity> for ActivityDocument {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id.to_string(),
            group_id: activity.group_id.clone(),
            title: activity.title.clone(),
            description: activity.description.clone(),
            scheduled_time: activity.scheduled_time,
            created_at: activity.created_at,
            votes: activity
                .votes
                .iter()
                .map(|(member, vote)| (member.clone(), vote.as_wire().to_string()))
                .collect(),
            status: activity.status.as_wire().to_string(),
        }
    }
}

/// Converts a batch of documents, excluding malformed records.
pub fn ingest_documents(documents: Vec<ActivityDocument>) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for document in documents {
        match Activity::try_from(document) {
            Ok(activity) => outcome.activities.push(activity),
            Err(err) => {
                log_rejection(&err);
                outcome.rejected.push(err);
            }
        }
    }
    log_outcome(&outcome);
    outcome
}

/// Parses a JSON array of activity documents.
///
/// Elements with the wrong shape are rejected individually.
///
/// # Errors
/// - `InvalidPayload` when `payload` is not a JSON array.
pub fn ingest_json(payload: &str) -> Result<IngestOutcome, IngestError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(payload)
        .map_err(|err| IngestError::InvalidPayload(err.to_string()))?;

    let mut outcome = IngestOutcome::default();
    for (index, value) in values.into_iter().enumerate() {
        let record_id = value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{index}"));

        let converted = serde_json::from_value::<ActivityDocument>(value)
            .map_err(|err| IngestError::malformed(&record_id, err.to_string()))
            .and_then(Activity::try_from);

        match converted {
            Ok(activity) => outcome.activities.push(activity),
            Err(err) => {
                log_rejection(&err);
                outcome.rejected.push(err);
            }
        }
    }
    log_outcome(&outcome);
    Ok(outcome)
}

fn log_rejection(err: &IngestError) {
    if let IngestError::MalformedRecord { record_id, reason } = err {
        warn!(
            "event=record_rejected module=ingest status=error error_code=malformed_record record_id={} reason={}",
            record_id, reason
        );
    }
}

fn log_outcome(outcome: &IngestOutcome) {
    info!(
        "event=ingest_batch module=ingest status=ok accepted={} rejected={}",
        outcome.activities.len(),
        outcome.rejected.len()
    );
}

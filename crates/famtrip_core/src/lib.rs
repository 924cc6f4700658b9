//! Core domain logic for the family trip planner.
//! This crate is the single source of truth for activity ranking and voting.

pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod planner;
pub mod repo;
pub mod service;

pub use ingest::document::{
    ingest_documents, ingest_json, ActivityDocument, IngestError, IngestOutcome,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::activity::{
    Activity, ActivityId, ActivityStatus, ActivityValidationError, FamilyGroupId, MemberId,
    VoteType,
};
pub use planner::ranking::{compare_for_ranking, rank_activities, rank_in_place};
pub use planner::tally::{tally_votes, voters_for, VoteTally};
pub use repo::activity_repo::{
    ActivityRepository, GroupActivities, RepoError, RepoResult, SqliteActivityRepository,
};
pub use service::planner_service::{
    CreateActivityRequest, PlannerBoard, PlannerEntry, PlannerResult, PlannerService,
    PlannerServiceError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

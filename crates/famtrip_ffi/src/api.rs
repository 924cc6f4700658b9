//! FFI use-case API for Flutter-facing planner calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level planner functions to Dart via FRB.
//! - Validate vote/status strings coming from the UI before they reach core.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported through `ok=false` envelopes with a message.

use famtrip_core::db::open_db;
use famtrip_core::{
    core_version as core_version_inner, ingest_json, init_logging as init_logging_inner,
    ping as ping_inner, ActivityId, ActivityStatus, CreateActivityRequest, PlannerEntry,
    PlannerService, SqliteActivityRepository, VoteTally, VoteType,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const PLANNER_DB_FILE_NAME: &str = "famtrip_planner.sqlite3";
const PLANNER_DB_PATH_ENV: &str = "FAMTRIP_DB_PATH";
static PLANNER_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Vote tally projection for progress bars and vote buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerTally {
    pub yes_count: u32,
    pub no_count: u32,
    pub maybe_count: u32,
    pub total_voters: u32,
    /// In `[0.0, 1.0]`; `0.0` when nobody voted.
    pub yes_ratio: f64,
}

/// One ranked planner row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerItem {
    /// Stable activity ID in string form.
    pub activity_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_epoch_ms: Option<i64>,
    pub created_epoch_ms: i64,
    /// `planned|confirmed|completed|cancelled`.
    pub status: String,
    pub tally: PlannerTally,
}

/// Ranked board envelope for one family group.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerBoardResponse {
    pub ok: bool,
    /// Items in display order.
    pub items: Vec<PlannerItem>,
    /// Stored records skipped as malformed.
    pub rejected_count: u32,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Action envelope for create/status/delete/import flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected activity ID, when there is exactly one.
    pub activity_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl PlannerActionResponse {
    fn success(message: impl Into<String>, activity_id: Option<String>) -> Self {
        Self {
            ok: true,
            activity_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            activity_id: None,
            message: message.into(),
        }
    }
}

/// Vote envelope carrying the refreshed tally.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerVoteResponse {
    pub ok: bool,
    /// Tally after the write; `None` on failure.
    pub tally: Option<PlannerTally>,
    pub message: String,
}

impl PlannerVoteResponse {
    fn from_result(operation: &str, result: Result<VoteTally, String>) -> Self {
        match result {
            Ok(tally) => Self {
                ok: true,
                tally: Some(to_planner_tally(tally)),
                message: "Vote saved.".to_string(),
            },
            Err(err) => Self {
                ok: false,
                tally: None,
                message: format!("{operation} failed: {err}"),
            },
        }
    }
}

/// Proposes a new activity for a family group.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `created_by`, when set, is recorded as that member's yes vote.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_create_activity(
    group_id: String,
    title: String,
    description: Option<String>,
    scheduled_epoch_ms: Option<i64>,
    created_by: Option<String>,
) -> PlannerActionResponse {
    let request = CreateActivityRequest {
        group_id: group_id.trim().to_string(),
        title,
        description,
        scheduled_time: scheduled_epoch_ms,
        created_by,
    };
    match with_planner_service(|service| {
        service
            .create_activity(request)
            .map_err(|err| err.to_string())
    }) {
        Ok(activity) => {
            PlannerActionResponse::success("Activity created.", Some(activity.id.to_string()))
        }
        Err(err) => {
            PlannerActionResponse::failure(format!("planner_create_activity failed: {err}"))
        }
    }
}

/// Records a member's vote (`yes|no|maybe`); a later vote replaces an earlier one.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Unknown vote strings are rejected without touching storage.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_cast_vote(
    activity_id: String,
    member_id: String,
    vote: String,
) -> PlannerVoteResponse {
    let result = parse_activity_id(&activity_id).and_then(|id| {
        let vote = parse_vote(&vote)?;
        with_planner_service(|service| {
            service
                .cast_vote(id, &member_id, vote)
                .map_err(|err| err.to_string())
        })
    });
    PlannerVoteResponse::from_result("planner_cast_vote", result)
}

/// Withdraws a member's vote.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Clearing a vote that does not exist succeeds with an unchanged tally.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_clear_vote(activity_id: String, member_id: String) -> PlannerVoteResponse {
    let result = parse_activity_id(&activity_id).and_then(|id| {
        with_planner_service(|service| {
            service
                .clear_vote(id, &member_id)
                .map_err(|err| err.to_string())
        })
    });
    PlannerVoteResponse::from_result("planner_clear_vote", result)
}

/// Moves an activity to `planned|confirmed|completed|cancelled`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Disallowed lifecycle moves return `ok=false`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_set_status(activity_id: String, status: String) -> PlannerActionResponse {
    let result = parse_activity_id(&activity_id).and_then(|id| {
        let status = parse_status(&status)?;
        with_planner_service(|service| {
            service
                .advance_status(id, status)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(activity) => {
            PlannerActionResponse::success("Status updated.", Some(activity.id.to_string()))
        }
        Err(err) => PlannerActionResponse::failure(format!("planner_set_status failed: {err}")),
    }
}

/// Deletes an activity and its votes.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_delete_activity(activity_id: String) -> PlannerActionResponse {
    let result = parse_activity_id(&activity_id).and_then(|id| {
        with_planner_service(|service| service.delete_activity(id).map_err(|err| err.to_string()))
            .map(|()| id)
    });
    match result {
        Ok(id) => PlannerActionResponse::success("Activity deleted.", Some(id.to_string())),
        Err(err) => {
            PlannerActionResponse::failure(format!("planner_delete_activity failed: {err}"))
        }
    }
}

/// Returns the ranked board with tallies for one family group.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Malformed stored records are skipped and counted, never fatal.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_board(group_id: String) -> PlannerBoardResponse {
    let group_id = group_id.trim().to_string();
    match with_planner_service(|service| service.board(&group_id).map_err(|err| err.to_string()))
    {
        Ok(board) => {
            let items = board
                .entries
                .into_iter()
                .map(to_planner_item)
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No activities.".to_string()
            } else {
                format!("Found {} activities.", items.len())
            };
            PlannerBoardResponse {
                ok: true,
                items,
                rejected_count: u32::try_from(board.rejected_count).unwrap_or(u32::MAX),
                message,
            }
        }
        Err(err) => PlannerBoardResponse {
            ok: false,
            items: Vec::new(),
            rejected_count: 0,
            message: format!("planner_board failed: {err}"),
        },
    }
}

/// Imports a JSON array of activity documents exported by the cloud store.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Malformed records are skipped; the message reports imported/skipped counts.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_import_json(payload: String) -> PlannerActionResponse {
    let outcome = match ingest_json(&payload) {
        Ok(outcome) => outcome,
        Err(err) => {
            return PlannerActionResponse::failure(format!("planner_import_json failed: {err}"))
        }
    };
    let skipped = outcome.rejected.len();
    match with_planner_service(|service| {
        service
            .import_activities(&outcome.activities)
            .map_err(|err| err.to_string())
    }) {
        Ok(imported) => PlannerActionResponse::success(
            format!("Imported {imported} activities, skipped {skipped}."),
            None,
        ),
        Err(err) => PlannerActionResponse::failure(format!("planner_import_json failed: {err}")),
    }
}

fn parse_activity_id(raw: &str) -> Result<ActivityId, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid activity id `{raw}`"))
}

fn parse_vote(raw: &str) -> Result<VoteType, String> {
    VoteType::from_wire(raw.trim().to_ascii_lowercase().as_str()).ok_or_else(|| {
        warn!("event=vote_rejected module=ffi status=error error_code=unknown_vote");
        format!("unknown vote `{raw}`; expected yes|no|maybe")
    })
}

fn parse_status(raw: &str) -> Result<ActivityStatus, String> {
    ActivityStatus::from_wire(raw.trim().to_ascii_lowercase().as_str()).ok_or_else(|| {
        format!("unknown status `{raw}`; expected planned|confirmed|completed|cancelled")
    })
}

fn resolve_planner_db_path() -> PathBuf {
    PLANNER_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(PLANNER_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(PLANNER_DB_FILE_NAME)
        })
        .clone()
}

fn with_planner_service<T>(
    f: impl FnOnce(&mut PlannerService<SqliteActivityRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    let db_path = resolve_planner_db_path();
    let mut conn = open_db(&db_path).map_err(|err| format!("planner DB open failed: {err}"))?;
    let repo = SqliteActivityRepository::try_new(&mut conn)
        .map_err(|err| format!("planner repo init failed: {err}"))?;
    let mut service = PlannerService::new(repo);
    f(&mut service)
}

fn to_planner_tally(tally: VoteTally) -> PlannerTally {
    PlannerTally {
        yes_count: tally.yes_count,
        no_count: tally.no_count,
        maybe_count: tally.maybe_count,
        total_voters: tally.total_voters,
        yes_ratio: tally.yes_ratio,
    }
}

fn to_planner_item(entry: PlannerEntry) -> PlannerItem {
    PlannerItem {
        activity_id: entry.activity.id.to_string(),
        title: entry.activity.title,
        description: entry.activity.description,
        scheduled_epoch_ms: entry.activity.scheduled_time,
        created_epoch_ms: entry.activity.created_at,
        status: entry.activity.status.as_wire().to_string(),
        tally: to_planner_tally(entry.tally),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, planner_board, planner_cast_vote, planner_clear_vote,
        planner_create_activity, planner_delete_activity, planner_import_json,
        planner_set_status,
    };
    use famtrip_core::db::open_db;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn created_activity_with_yes_vote_ranks_first() {
        let group = unique_token("group-rank");
        let scheduled = planner_create_activity(
            group.clone(),
            "Early breakfast".to_string(),
            None,
            Some(1_700_000_000_000),
            None,
        );
        assert!(scheduled.ok, "{}", scheduled.message);
        let voted = planner_create_activity(
            group.clone(),
            "Lazy beach day".to_string(),
            Some("sunscreen".to_string()),
            None,
            Some("mom".to_string()),
        );
        assert!(voted.ok, "{}", voted.message);

        let board = planner_board(group);
        assert!(board.ok, "{}", board.message);
        assert_eq!(board.items.len(), 2);
        assert_eq!(board.items[0].activity_id, voted.activity_id.unwrap());
        assert_eq!(board.items[0].tally.yes_count, 1);
        assert_eq!(board.items[1].tally.yes_ratio, 0.0);
    }

    #[test]
    fn cast_vote_overwrites_previous_vote() {
        let group = unique_token("group-vote");
        let created = planner_create_activity(group, "Pier".to_string(), None, None, None);
        let activity_id = created.activity_id.expect("create should return activity_id");

        let first = planner_cast_vote(activity_id.clone(), "dad".to_string(), "no".to_string());
        assert!(first.ok, "{}", first.message);
        let second = planner_cast_vote(activity_id.clone(), "dad".to_string(), "YES".to_string());
        let tally = second.tally.expect("vote should return tally");
        assert_eq!(tally.total_voters, 1);
        assert_eq!(tally.yes_count, 1);

        let conn = open_db(super::resolve_planner_db_path()).expect("open db");
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM activity_votes WHERE activity_uuid = ?1",
                [activity_id.as_str()],
                |row| row.get(0),
            )
            .expect("count vote rows");
        assert_eq!(rows, 1);

        let cleared = planner_clear_vote(activity_id, "dad".to_string());
        assert_eq!(cleared.tally.expect("tally").total_voters, 0);
    }

    #[test]
    fn cast_vote_rejects_unknown_value() {
        let group = unique_token("group-bad-vote");
        let created = planner_create_activity(group, "Pier".to_string(), None, None, None);
        let activity_id = created.activity_id.expect("create should return activity_id");

        let response = planner_cast_vote(activity_id, "dad".to_string(), "sure".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("unknown vote"));
    }

    #[test]
    fn set_status_rejects_disallowed_move() {
        let group = unique_token("group-status");
        let created = planner_create_activity(group, "Tram".to_string(), None, None, None);
        let activity_id = created.activity_id.expect("create should return activity_id");

        let skipped = planner_set_status(activity_id.clone(), "completed".to_string());
        assert!(!skipped.ok);
        let confirmed = planner_set_status(activity_id.clone(), "confirmed".to_string());
        assert!(confirmed.ok, "{}", confirmed.message);

        let deleted = planner_delete_activity(activity_id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert!(!planner_delete_activity(activity_id).ok);
    }

    #[test]
    fn import_json_skips_malformed_records() {
        let group = unique_token("group-import");
        let payload = format!(
            r#"[
                {{"id": "{}", "group_id": "{group}", "title": "Gondola", "created_at": 1}},
                {{"id": "not-a-uuid", "group_id": "{group}", "title": "Broken", "created_at": 2}}
            ]"#,
            uuid::Uuid::new_v4()
        );

        let response = planner_import_json(payload);
        assert!(response.ok, "{}", response.message);
        assert!(response.message.contains("skipped 1"));
        assert_eq!(planner_board(group).items.len(), 1);
    }

    #[test]
    fn import_json_twice_replaces_instead_of_failing() {
        let group = unique_token("group-reimport");
        let stored_id = uuid::Uuid::new_v4();
        let first = format!(
            r#"[{{"id": "{stored_id}", "group_id": "{group}", "title": "Gondola", "created_at": 1}}]"#
        );
        assert!(planner_import_json(first).ok);

        let second = format!(
            r#"[
                {{"id": "{}", "group_id": "{group}", "title": "Cable car", "created_at": 2}},
                {{"id": "{stored_id}", "group_id": "{group}", "title": "Gondola ride", "created_at": 9,
                  "votes": {{"mom": "yes"}}}}
            ]"#,
            uuid::Uuid::new_v4()
        );
        let response = planner_import_json(second);
        assert!(response.ok, "{}", response.message);

        let board = planner_board(group);
        assert_eq!(board.items.len(), 2);
        assert_eq!(board.items[0].title, "Gondola ride");
        assert_eq!(board.items[0].created_epoch_ms, 1);
        assert_eq!(board.items[0].tally.yes_count, 1);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}

//! Activity repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and vote APIs over `activities` / `activity_votes` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Activity::validate()` before SQL mutations.
//! - One vote row per `(activity, member)`; a new vote replaces the old one.
//! - Rows are decoded through the ingestion boundary; a malformed row
//!   (bad enum text or a column of the wrong type) is excluded from group
//!   listings and reported instead of failing the list.
//! - Imports upsert by `uuid` in one transaction and never rewrite `created_at`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::ingest::document::{ActivityDocument, IngestError};
use crate::model::activity::{
    Activity, ActivityId, ActivityStatus, ActivityValidationError, VoteType,
};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const ACTIVITY_SELECT_SQL: &str = "SELECT
    uuid,
    group_id,
    title,
    description,
    scheduled_time,
    created_at,
    status
FROM activities";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "activities",
        &[
            "uuid",
            "group_id",
            "title",
            "description",
            "scheduled_time",
            "created_at",
            "status",
            "updated_at",
        ],
    ),
    ("activity_votes", &["activity_uuid", "member_id", "vote", "voted_at"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for activity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ActivityValidationError),
    Db(DbError),
    NotFound(ActivityId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "activity not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted activity data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ActivityValidationError> for RepoError {
    fn from(value: ActivityValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Activities of one family group, as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupActivities {
    /// Decodable activities ordered by `created_at DESC, uuid ASC`.
    pub activities: Vec<Activity>,
    /// Rows excluded because they could not be decoded.
    pub rejected: Vec<IngestError>,
}

/// Repository interface for activity and vote operations.
pub trait ActivityRepository {
    /// Inserts the activity with its current votes in one transaction.
    fn create_activity(&mut self, activity: &Activity) -> RepoResult<ActivityId>;
    /// Stores fetched activities all-or-nothing, replacing existing ones by id.
    ///
    /// Returns the number of stored activities.
    fn import_activities(&mut self, activities: &[Activity]) -> RepoResult<usize>;
    /// Gets one activity with its votes.
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    /// Lists all activities of a family group.
    fn list_group_activities(&self, group_id: &str) -> RepoResult<GroupActivities>;
    /// Records or replaces one member's vote.
    fn upsert_vote(&self, id: ActivityId, member: &str, vote: VoteType) -> RepoResult<()>;
    /// Removes one member's vote. Returns whether a vote existed.
    fn remove_vote(&self, id: ActivityId, member: &str) -> RepoResult<bool>;
    /// Overwrites the lifecycle status.
    fn update_status(&self, id: ActivityId, status: ActivityStatus) -> RepoResult<()>;
    /// Overwrites title, description and schedule.
    fn update_details(
        &self,
        id: ActivityId,
        title: &str,
        description: Option<&str>,
        scheduled_time: Option<i64>,
    ) -> RepoResult<()>;
    /// Deletes the activity and, through cascade, its votes.
    fn delete_activity(&self, id: ActivityId) -> RepoResult<()>;
}

/// SQLite-backed activity repository.
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for foreign schemas.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn create_activity(&mut self, activity: &Activity) -> RepoResult<ActivityId> {
        activity.validate()?;

        let tx = self.conn.transaction()?;
        write_activity(&tx, activity, WriteMode::Insert)?;
        tx.commit()?;

        Ok(activity.id)
    }

    fn import_activities(&mut self, activities: &[Activity]) -> RepoResult<usize> {
        for activity in activities {
            activity.validate()?;
        }

        let tx = self.conn.transaction()?;
        for activity in activities {
            write_activity(&tx, activity, WriteMode::Upsert)?;
        }
        tx.commit()?;

        Ok(activities.len())
    }

    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let document = read_document(self.conn, row).map_err(|err| {
            if is_column_decode_error(&err) {
                RepoError::InvalidData(err.to_string())
            } else {
                err.into()
            }
        })?;
        let activity =
            Activity::try_from(document).map_err(|err| RepoError::InvalidData(err.to_string()))?;
        Ok(Some(activity))
    }

    fn list_group_activities(&self, group_id: &str) -> RepoResult<GroupActivities> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTIVITY_SELECT_SQL}
             WHERE group_id = ?1
             ORDER BY created_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([group_id])?;
        let mut listing = GroupActivities::default();

        while let Some(row) = rows.next()? {
            let decoded = match read_document(self.conn, row) {
                Ok(document) => Activity::try_from(document),
                Err(err) if is_column_decode_error(&err) => Err(IngestError::MalformedRecord {
                    record_id: row
                        .get::<_, String>("uuid")
                        .unwrap_or_else(|_| "<unreadable>".to_string()),
                    reason: err.to_string(),
                }),
                Err(err) => return Err(err.into()),
            };
            match decoded {
                Ok(activity) => listing.activities.push(activity),
                Err(err) => {
                    warn!(
                        "event=activity_row_rejected module=repo status=error error_code=malformed_record error={}",
                        err
                    );
                    listing.rejected.push(err);
                }
            }
        }

        Ok(listing)
    }

    fn upsert_vote(&self, id: ActivityId, member: &str, vote: VoteType) -> RepoResult<()> {
        if member.trim().is_empty() {
            return Err(ActivityValidationError::BlankMemberId.into());
        }
        let id_text = id.to_string();
        if !activity_exists(self.conn, &id_text)? {
            return Err(RepoError::NotFound(id));
        }

        self.conn.execute(
            "INSERT INTO activity_votes (activity_uuid, member_id, vote, voted_at)
             VALUES (?1, ?2, ?3, (strftime('%s', 'now') * 1000))
             ON CONFLICT (activity_uuid, member_id) DO UPDATE SET
                vote = excluded.vote,
                voted_at = excluded.voted_at;",
            params![id_text.as_str(), member, vote.as_wire()],
        )?;
        touch_activity(self.conn, &id_text)?;
        Ok(())
    }

    fn remove_vote(&self, id: ActivityId, member: &str) -> RepoResult<bool> {
        let id_text = id.to_string();
        if !activity_exists(self.conn, &id_text)? {
            return Err(RepoError::NotFound(id));
        }

        let removed = self.conn.execute(
            "DELETE FROM activity_votes WHERE activity_uuid = ?1 AND member_id = ?2;",
            params![id_text.as_str(), member],
        )?;
        if removed > 0 {
            touch_activity(self.conn, &id_text)?;
        }
        Ok(removed > 0)
    }

    fn update_status(&self, id: ActivityId, status: ActivityStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE activities
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), status.as_wire()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn update_details(
        &self,
        id: ActivityId,
        title: &str,
        description: Option<&str>,
        scheduled_time: Option<i64>,
    ) -> RepoResult<()> {
        if title.trim().is_empty() {
            return Err(ActivityValidationError::BlankTitle.into());
        }

        let changed = self.conn.execute(
            "UPDATE activities
             SET
                title = ?2,
                description = ?3,
                scheduled_time = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), title, description, scheduled_time],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_activity(&self, id: ActivityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM activities WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Insert,
    /// Replace fields and votes of an existing row, keeping `created_at`.
    Upsert,
}

fn write_activity(tx: &Transaction<'_>, activity: &Activity, mode: WriteMode) -> RepoResult<()> {
    let id_text = activity.id.to_string();
    let on_conflict = match mode {
        WriteMode::Insert => "",
        WriteMode::Upsert => {
            "ON CONFLICT (uuid) DO UPDATE SET
                group_id = excluded.group_id,
                title = excluded.title,
                description = excluded.description,
                scheduled_time = excluded.scheduled_time,
                status = excluded.status,
                updated_at = (strftime('%s', 'now') * 1000)"
        }
    };
    tx.execute(
        &format!(
            "INSERT INTO activities (
                uuid,
                group_id,
                title,
                description,
                scheduled_time,
                created_at,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            {on_conflict};"
        ),
        params![
            id_text.as_str(),
            activity.group_id.as_str(),
            activity.title.as_str(),
            activity.description.as_deref(),
            activity.scheduled_time,
            activity.created_at,
            activity.status.as_wire(),
        ],
    )?;

    if mode == WriteMode::Upsert {
        tx.execute(
            "DELETE FROM activity_votes WHERE activity_uuid = ?1;",
            [id_text.as_str()],
        )?;
    }
    for (member, vote) in &activity.votes {
        tx.execute(
            "INSERT INTO activity_votes (activity_uuid, member_id, vote)
             VALUES (?1, ?2, ?3);",
            params![id_text.as_str(), member.as_str(), vote.as_wire()],
        )?;
    }
    Ok(())
}

fn read_document(conn: &Connection, row: &Row<'_>) -> rusqlite::Result<ActivityDocument> {
    let id: String = row.get("uuid")?;
    let votes = load_votes(conn, &id)?;
    Ok(ActivityDocument {
        id,
        group_id: row.get("group_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        scheduled_time: row.get("scheduled_time")?,
        created_at: row.get("created_at")?,
        votes,
        status: row.get("status")?,
    })
}

/// Stored value has the wrong SQLite type or does not fit the Rust type.
fn is_column_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}

fn load_votes(
    conn: &Connection,
    activity_uuid: &str,
) -> rusqlite::Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare(
        "SELECT member_id, vote
         FROM activity_votes
         WHERE activity_uuid = ?1
         ORDER BY member_id ASC;",
    )?;
    let mut rows = stmt.query([activity_uuid])?;
    let mut votes = BTreeMap::new();
    while let Some(row) = rows.next()? {
        votes.insert(row.get::<_, String>(0)?, row.get::<_, String>(1)?);
    }
    Ok(votes)
}

fn activity_exists(conn: &Connection, activity_uuid: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM activities WHERE uuid = ?1;",
            [activity_uuid],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn touch_activity(conn: &Connection, activity_uuid: &str) -> RepoResult<()> {
    conn.execute(
        "UPDATE activities
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [activity_uuid],
    )?;
    Ok(())
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

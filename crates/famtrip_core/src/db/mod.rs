//! SQLite storage for family activities and their votes.
//!
//! # Responsibility
//! - Open connections the activity repository can use directly.
//! - Own the `activities` / `activity_votes` schema and its version.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`; a newer file is refused.
//! - `activity_votes` rows belong to one activity and go away with it
//!   (`ON DELETE CASCADE`, which needs `foreign_keys=ON`).
//! - `activity_votes.vote` and `activities.status` are free text. Unknown
//!   values are stored as fetched and rejected per record when read.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

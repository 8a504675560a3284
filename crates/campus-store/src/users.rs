//! Profile operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use campus_shared::constants::DEFAULT_TRUST_SCORE;

use crate::database::{not_found, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{ProfileUpsert, User};

const USER_COLUMNS: &str =
    "uid, email, display_name, photo_url, trust_score, listed_items, borrowed_items, created_at";

/// Per-user activity counters kept on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    ListedItems,
    BorrowedItems,
}

impl Database {
    /// Create the profile if missing, otherwise merge the supplied fields.
    ///
    /// New profiles start with the default trust score and zero counters;
    /// existing scores and counters are never touched here.
    pub fn upsert_profile(&self, profile: &ProfileUpsert, now: DateTime<Utc>) -> Result<User> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (uid, email, display_name, photo_url, trust_score,
                                listed_items, borrowed_items, created_at)
             VALUES (?1, COALESCE(?2, ''), COALESCE(?3, ''), ?4, ?5, 0, 0, ?6)
             ON CONFLICT(uid) DO UPDATE SET
                email        = COALESCE(?2, users.email),
                display_name = COALESCE(?3, users.display_name),
                photo_url    = COALESCE(?4, users.photo_url)",
            params![
                profile.uid,
                profile.email,
                profile.display_name,
                profile.photo_url,
                DEFAULT_TRUST_SCORE,
                now.to_rfc3339(),
            ],
        )?;
        get_user_in(&conn, &profile.uid)
    }

    /// Update display fields of an existing profile.
    pub fn update_profile(&self, profile: &ProfileUpsert) -> Result<User> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE users SET
                email        = COALESCE(?2, email),
                display_name = COALESCE(?3, display_name),
                photo_url    = COALESCE(?4, photo_url)
             WHERE uid = ?1",
            params![
                profile.uid,
                profile.email,
                profile.display_name,
                profile.photo_url,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        get_user_in(&conn, &profile.uid)
    }

    pub fn get_user(&self, uid: &str) -> Result<User> {
        get_user_in(&*self.conn()?, uid)
    }

    /// Email address on file for a user, if the profile exists and has one.
    pub fn user_email(&self, uid: &str) -> Result<Option<String>> {
        let email: Option<String> = self
            .conn()?
            .query_row(
                "SELECT email FROM users WHERE uid = ?1",
                params![uid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(email.filter(|e| !e.is_empty()))
    }

    /// All profiles, newest first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

pub(crate) fn get_user_in(conn: &Connection, uid: &str) -> Result<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1"),
        params![uid],
        row_to_user,
    )
    .map_err(not_found)
}

/// Add `delta` to one of the profile counters. Missing profiles are ignored.
pub(crate) fn bump_counter(conn: &Connection, uid: &str, counter: Counter, delta: i64) -> Result<()> {
    let sql = match counter {
        Counter::ListedItems => {
            "UPDATE users SET listed_items = MAX(listed_items + ?2, 0) WHERE uid = ?1"
        }
        Counter::BorrowedItems => {
            "UPDATE users SET borrowed_items = MAX(borrowed_items + ?2, 0) WHERE uid = ?1"
        }
    };
    let affected = conn.execute(sql, params![uid, delta])?;
    if affected == 0 {
        tracing::debug!(uid, ?counter, "counter update skipped, no profile");
    }
    Ok(())
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_str: String = row.get(7)?;
    Ok(User {
        uid: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        photo_url: row.get(3)?,
        trust_score: row.get(4)?,
        listed_items: row.get(5)?,
        borrowed_items: row.get(6)?,
        created_at: parse_timestamp(7, &created_str)?,
    })
}

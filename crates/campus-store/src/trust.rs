//! Trust score adjustments.
//!
//! Every change to a user's trust score goes through
//! [`adjust_trust_score_in`], which applies the delta and writes an audit
//! row in the caller's transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use campus_shared::TrustReason;

use crate::database::{parse_enum, parse_timestamp, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::TrustEvent;

impl Database {
    /// Apply a standalone trust adjustment in its own transaction.
    ///
    /// Returns the new score, or `None` when the user has no profile.
    pub fn adjust_trust_score(
        &self,
        uid: &str,
        delta: i64,
        reason: TrustReason,
        rental_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let score = adjust_trust_score_in(&tx, uid, delta, reason, rental_id, now)?;
        tx.commit()?;
        Ok(score)
    }

    /// Audit trail for one user, newest first.
    pub fn trust_history(&self, uid: &str) -> Result<Vec<TrustEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, uid, delta, reason, rental_id, created_at
             FROM trust_events
             WHERE uid = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![uid], row_to_trust_event)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

/// The single mutation site for trust scores.
///
/// The audit row is written even when the profile is missing so the
/// adjustment can be reconciled later.
pub(crate) fn adjust_trust_score_in(
    conn: &Connection,
    uid: &str,
    delta: i64,
    reason: TrustReason,
    rental_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    conn.execute(
        "INSERT INTO trust_events (id, uid, delta, reason, rental_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Uuid::new_v4().to_string(),
            uid,
            delta,
            reason.as_str(),
            rental_id.map(|id| id.to_string()),
            now.to_rfc3339(),
        ],
    )?;

    let score: Option<i64> = conn
        .query_row(
            "UPDATE users SET trust_score = trust_score + ?2 WHERE uid = ?1
             RETURNING trust_score",
            params![uid, delta],
            |row| row.get(0),
        )
        .optional()?;

    match score {
        Some(score) => {
            tracing::info!(uid, delta, reason = reason.as_str(), score, "trust score adjusted");
        }
        None => {
            tracing::warn!(uid, delta, reason = reason.as_str(), "trust adjustment for unknown user");
        }
    }
    Ok(score)
}

fn row_to_trust_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrustEvent> {
    let id_str: String = row.get(0)?;
    let reason_str: String = row.get(3)?;
    let rental_str: Option<String> = row.get(4)?;
    let created_str: String = row.get(5)?;

    Ok(TrustEvent {
        id: parse_uuid(0, &id_str)?,
        uid: row.get(1)?,
        delta: row.get(2)?,
        reason: parse_enum(3, &reason_str)?,
        rental_id: rental_str.map(|s| parse_uuid(4, &s)).transpose()?,
        created_at: parse_timestamp(5, &created_str)?,
    })
}

//! Durable notification outbox.
//!
//! Business operations append [`OutboxEvent`]s inside their own
//! transaction; the server's dispatcher drains pending rows, delivers them
//! and records the outcome.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::database::{parse_timestamp, Database};
use crate::error::Result;
use crate::models::{OutboxEntry, OutboxEvent};

impl Database {
    /// Queue an event outside any other write.
    pub fn enqueue(&self, event: &OutboxEvent, now: DateTime<Utc>) -> Result<i64> {
        enqueue_in(&*self.conn()?, event, now)
    }

    /// Undelivered events with fewer than `max_attempts` tries, oldest first.
    ///
    /// Rows whose payload no longer parses are skipped with a warning.
    pub fn pending_outbox(&self, limit: u32, max_attempts: u32) -> Result<Vec<OutboxEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload, attempts, last_error, created_at
             FROM outbox
             WHERE delivered_at IS NULL AND attempts < ?1
             ORDER BY id ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![max_attempts, limit], |row| {
            let created_str: String = row.get(4)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<String>>(3)?,
                parse_timestamp(4, &created_str)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, payload, attempts, last_error, created_at) = row?;
            match serde_json::from_str::<OutboxEvent>(&payload) {
                Ok(event) => entries.push(OutboxEntry {
                    id,
                    event,
                    attempts,
                    last_error,
                    created_at,
                }),
                Err(e) => tracing::warn!(id, error = %e, "skipping unreadable outbox row"),
            }
        }
        Ok(entries)
    }

    pub fn mark_delivered(&self, id: i64, now: DateTime<Utc>) -> Result<()> {
        self.conn()?.execute(
            "UPDATE outbox SET delivered_at = ?2, attempts = attempts + 1, last_error = NULL
             WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Count a failed attempt. Returns the attempt total.
    pub fn record_delivery_failure(&self, id: i64, error: &str) -> Result<u32> {
        let attempts = self.conn()?.query_row(
            "UPDATE outbox SET attempts = attempts + 1, last_error = ?2
             WHERE id = ?1
             RETURNING attempts",
            params![id, error],
            |row| row.get(0),
        )?;
        Ok(attempts)
    }

    /// Number of undelivered events, including ones that exhausted retries.
    pub fn outbox_backlog(&self) -> Result<u64> {
        let count = self.conn()?.query_row(
            "SELECT COUNT(*) FROM outbox WHERE delivered_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Append an event using the caller's connection or transaction.
pub(crate) fn enqueue_in(conn: &Connection, event: &OutboxEvent, now: DateTime<Utc>) -> Result<i64> {
    let payload = serde_json::to_string(event)?;
    conn.execute(
        "INSERT INTO outbox (payload, created_at) VALUES (?1, ?2)",
        params![payload, now.to_rfc3339()],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, kind = event.kind(), "event queued");
    Ok(id)
}

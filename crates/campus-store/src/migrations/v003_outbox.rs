use rusqlite::Connection;

// Notification events written in the same transaction as the state change
// that caused them; the dispatcher drains undelivered rows.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS outbox (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    payload      TEXT NOT NULL,              -- JSON, tagged by "kind"
    attempts     INTEGER NOT NULL DEFAULT 0,
    last_error   TEXT,
    delivered_at TEXT,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox(delivered_at, attempts);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! v001 -- Initial schema creation.
//!
//! Creates the marketplace tables: `users`, `items`, `rentals`,
//! `otp_verifications`, `wishlist` and `trust_events`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (profiles written by the identity hook)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid            TEXT PRIMARY KEY NOT NULL,   -- identity provider id
    email          TEXT NOT NULL DEFAULT '',
    display_name   TEXT NOT NULL DEFAULT '',
    photo_url      TEXT,
    trust_score    INTEGER NOT NULL DEFAULT 5,
    listed_items   INTEGER NOT NULL DEFAULT 0,
    borrowed_items INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL                -- RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- ----------------------------------------------------------------
-- Items
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS items (
    id           TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    owner_id     TEXT NOT NULL,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    price        REAL NOT NULL DEFAULT 0,       -- currency units per day
    image_url    TEXT,
    available    INTEGER NOT NULL DEFAULT 1,    -- boolean 0/1
    listing_type TEXT NOT NULL,                 -- rent | share
    category     TEXT NOT NULL DEFAULT '',
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id, created_at DESC);

-- ----------------------------------------------------------------
-- Rentals (no FK to items: deleting an item leaves rentals behind)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS rentals (
    id                     TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    item_id                TEXT NOT NULL,
    borrower_id            TEXT NOT NULL,
    lender_id              TEXT NOT NULL,
    start_date             TEXT NOT NULL,              -- YYYY-MM-DD
    end_date               TEXT NOT NULL,              -- YYYY-MM-DD
    return_deadline        TEXT NOT NULL,              -- RFC-3339
    status                 TEXT NOT NULL DEFAULT 'active',
    borrower_marked_return INTEGER NOT NULL DEFAULT 0,
    return_confirmed       INTEGER NOT NULL DEFAULT 0,
    reminder_sent          INTEGER NOT NULL DEFAULT 0,
    penalty_applied        INTEGER NOT NULL DEFAULT 0,
    return_date            TEXT,
    created_at             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rentals_status ON rentals(status);
CREATE INDEX IF NOT EXISTS idx_rentals_borrower ON rentals(borrower_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_rentals_lender ON rentals(lender_id, created_at DESC);

-- ----------------------------------------------------------------
-- Email verification codes (one row per email)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS otp_verifications (
    email      TEXT PRIMARY KEY NOT NULL,
    code       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    verified   INTEGER NOT NULL DEFAULT 0
);

-- ----------------------------------------------------------------
-- Wishlist snapshots
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS wishlist (
    uid          TEXT NOT NULL,
    item_id      TEXT NOT NULL,
    title        TEXT NOT NULL,
    price        REAL NOT NULL,
    image_url    TEXT,
    listing_type TEXT NOT NULL,
    category     TEXT NOT NULL,
    created_at   TEXT NOT NULL,

    PRIMARY KEY (uid, item_id)
);

-- ----------------------------------------------------------------
-- Trust score audit trail
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS trust_events (
    id         TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    uid        TEXT NOT NULL,
    delta      INTEGER NOT NULL,
    reason     TEXT NOT NULL,
    rental_id  TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trust_events_uid ON trust_events(uid, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `participants`, `direct_messages`,
//! `groups`, `group_members`, `group_messages`, and `archive_flags`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Participants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS participants (
    address         TEXT PRIMARY KEY NOT NULL,  -- hex-encoded 20-byte address
    name            TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT '',
    status_expiry   TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    profile_picture TEXT NOT NULL DEFAULT ''
);

-- ----------------------------------------------------------------
-- Direct messages, append-only per canonical chat key
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS direct_messages (
    chat_key   TEXT    NOT NULL,                -- hex-encoded 32-byte ChatKey
    seq        INTEGER NOT NULL,                -- stable index within the chat
    sender     TEXT    NOT NULL,                -- hex-encoded address
    content    TEXT    NOT NULL,
    created_at TEXT    NOT NULL,                -- ISO-8601
    is_read    INTEGER NOT NULL DEFAULT 0,      -- boolean 0/1
    is_deleted INTEGER NOT NULL DEFAULT 0,
    is_media   INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (chat_key, seq)
);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS groups (
    id          TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    admin       TEXT NOT NULL                   -- hex-encoded address
);

-- Membership rows double as the reverse index: address -> groups.
CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT    NOT NULL,                  -- FK -> groups(id)
    member   TEXT    NOT NULL,                  -- hex-encoded address
    pos      INTEGER NOT NULL,                  -- insertion order

    PRIMARY KEY (group_id, member),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_group_members_member ON group_members(member);

-- ----------------------------------------------------------------
-- Group messages, append-only per group
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_messages (
    group_id   TEXT    NOT NULL,                -- FK -> groups(id)
    seq        INTEGER NOT NULL,
    sender     TEXT    NOT NULL,
    content    TEXT    NOT NULL,
    created_at TEXT    NOT NULL,
    is_read    INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    is_media   INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (group_id, seq),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Archive flags, write-only from the ledger core
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS archive_flags (
    conversation TEXT    NOT NULL,              -- "dm:<hex>" or "group:<uuid>"
    participant  TEXT    NOT NULL,              -- hex-encoded address
    is_archived  INTEGER NOT NULL,

    PRIMARY KEY (conversation, participant)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! v001 -- Initial schema creation.
//!
//! Creates the `chats` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,  -- never reused after delete
    title      TEXT NOT NULL,
    history    TEXT NOT NULL,                      -- JSON array of {role, content}
    created_at TEXT NOT NULL                       -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

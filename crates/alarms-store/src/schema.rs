//! Database schema bootstrap.

use rusqlite::Connection;

/// Maximum length of the `subtopic` and `protocol` columns.
pub const MAX_LABEL_LEN: usize = 254;

/// Create the alarms table and its indexes if they do not exist.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS alarms (
            id       TEXT PRIMARY KEY NOT NULL CHECK (length(id) = 36),
            thing_id TEXT NOT NULL CHECK (length(thing_id) = 36),
            group_id TEXT NOT NULL CHECK (length(group_id) = 36),
            subtopic TEXT NOT NULL CHECK (length(subtopic) <= 254),
            protocol TEXT NOT NULL CHECK (length(protocol) <= 254),
            payload  TEXT NOT NULL,
            created  INTEGER NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_alarms_thing_created
            ON alarms(thing_id, created);
        CREATE INDEX IF NOT EXISTS idx_alarms_group_created
            ON alarms(group_id, created);
        "#,
    )
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                handle      TEXT PRIMARY KEY,
                password    TEXT NOT NULL,
                online      INTEGER NOT NULL DEFAULT 0,
                last_seen   TEXT NOT NULL DEFAULT 'Offline',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS "groups" (
                name        TEXT PRIMARY KEY,
                members     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            -- `message` holds the client's JSON document as-is.
            CREATE TABLE IF NOT EXISTS messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id     TEXT NOT NULL,
                message     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_chat
                ON messages(chat_id, created_at, id);

            INSERT INTO schema_version (version) VALUES (1);
            "#,
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

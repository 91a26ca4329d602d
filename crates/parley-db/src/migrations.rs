use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT UNIQUE,
            phone           TEXT UNIQUE,
            password_hash   TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            CHECK ((email IS NULL) <> (phone IS NULL))
        );

        -- sender_id / receiver_id are free-form: no foreign keys
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL,
            receiver_id     TEXT NOT NULL,
            content         TEXT NOT NULL,
            timestamp       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, receiver_id, timestamp);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

use crate::models::{MessageRow, UserRow, format_timestamp};
use crate::{Database, Result, StoreError};
use chrono::{DateTime, Utc};
use parley_types::api::IdentifierKind;
use parley_types::models::ChatMessage;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, email, phone, password_hash, created_at";

impl Database {
    // -- Users --

    /// Insert a user keyed on exactly one identifying value.
    /// Fails with [`StoreError::Duplicate`] if that value is already registered.
    pub fn create_user(
        &self,
        id: &str,
        kind: IdentifierKind,
        value: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let sql = match kind {
            IdentifierKind::Email => {
                "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)"
            }
            IdentifierKind::Phone => {
                "INSERT INTO users (id, phone, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)"
            }
        };

        self.with_conn(|conn| {
            conn.execute(
                sql,
                rusqlite::params![id, value, password_hash, format_timestamp(created_at)],
            )
            .map_err(map_constraint)?;
            Ok(())
        })
    }

    pub fn get_user_by_identifier(
        &self,
        kind: IdentifierKind,
        value: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_identifier(conn, kind, value))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY created_at, rowid",
                USER_COLUMNS
            ))?;

            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id.to_string(),
                    message.sender_id,
                    message.receiver_id,
                    message.content,
                    format_timestamp(message.timestamp),
                ],
            )?;
            Ok(())
        })
    }

    /// Every message exchanged between `a` and `b` in either direction,
    /// oldest first. Equal timestamps fall back to insertion order.
    pub fn get_conversation(&self, a: &str, b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_conversation(conn, a, b))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        phone: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_user_by_identifier(
    conn: &Connection,
    kind: IdentifierKind,
    value: &str,
) -> Result<Option<UserRow>> {
    let column = match kind {
        IdentifierKind::Email => "email",
        IdentifierKind::Phone => "phone",
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE {} = ?1",
        USER_COLUMNS, column
    ))?;

    let row = stmt.query_row([value], user_from_row).optional()?;

    Ok(row)
}

fn query_conversation(conn: &Connection, a: &str, b: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, content, timestamp
         FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2)
            OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY timestamp ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![a, b], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                receiver_id: row.get(2)?,
                content: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Unique-constraint violations become [`StoreError::Duplicate`].
fn map_constraint(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            StoreError::Duplicate
        }
        _ => StoreError::Sqlite(err),
    }
}

// Database row types: these map directly to SQLite rows.
// Distinct from parley-types models to keep the DB layer independent.

use chrono::{DateTime, SecondsFormat, Utc};
use parley_types::api::UserSummary;
use parley_types::models::ChatMessage;

use crate::{Result, StoreError};

pub struct UserRow {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: String,
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that
/// `ORDER BY timestamp` on the text column is chronological.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

impl UserRow {
    pub fn summary(&self) -> Result<UserSummary> {
        Ok(UserSummary {
            id: self
                .id
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("user id '{}': {}", self.id, e)))?,
            email: self.email.clone(),
            phone: self.phone.clone(),
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: self
                .id
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("message id '{}': {}", self.id, e)))?,
            timestamp: parse_timestamp(&self.timestamp)?,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
        })
    }
}

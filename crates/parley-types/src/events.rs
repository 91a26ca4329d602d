use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::loose;
use crate::models::ChatMessage;

/// Name of a per-user fan-out channel.
///
/// Clients may send user identifiers as JSON strings or numbers; both end up
/// as the same string key. Anything else is kept as its JSON text, so a
/// malformed identifier still names a (useless) channel instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChannelName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Uuid> for ChannelName {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelName {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        loose::text(de).map(Self)
    }
}

/// Commands sent FROM client TO server over the socket.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SocketCommand {
    /// Subscribe this connection to the channel named after a user id.
    JoinUser(ChannelName),

    /// Persist a message and fan it out to sender and receiver channels.
    SendMessage {
        sender_id: ChannelName,
        receiver_id: ChannelName,
        #[serde(deserialize_with = "loose::text")]
        content: String,
    },
}

/// Events sent FROM server TO client over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SocketEvent {
    /// Sent once after the upgrade. `user_id` is the identity bound from the
    /// upgrade token, if one was presented.
    Ready { user_id: Option<Uuid> },

    /// A message was persisted on a channel this connection joined.
    ReceiveMessage(ChatMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_accepts_string_and_number() {
        let a: SocketCommand = serde_json::from_str(r#"{"event":"join_user","data":"42"}"#).unwrap();
        let b: SocketCommand = serde_json::from_str(r#"{"event":"join_user","data":42}"#).unwrap();

        match (a, b) {
            (SocketCommand::JoinUser(a), SocketCommand::JoinUser(b)) => {
                assert_eq!(a, b);
                assert_eq!(a.as_str(), "42");
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn malformed_join_is_kept_as_json_text() {
        let cmd: SocketCommand =
            serde_json::from_str(r#"{"event":"join_user","data":{"id":1}}"#).unwrap();
        let SocketCommand::JoinUser(name) = cmd else {
            panic!("expected join_user");
        };
        assert_eq!(name.as_str(), r#"{"id":1}"#);
    }

    #[test]
    fn send_message_with_numeric_ids() {
        let cmd: SocketCommand = serde_json::from_str(
            r#"{"event":"send_message","data":{"sender_id":1,"receiver_id":"2","content":"hi"}}"#,
        )
        .unwrap();

        let SocketCommand::SendMessage { sender_id, receiver_id, content } = cmd else {
            panic!("expected send_message");
        };
        assert_eq!(sender_id.as_str(), "1");
        assert_eq!(receiver_id.as_str(), "2");
        assert_eq!(content, "hi");
    }

    #[test]
    fn receive_message_wire_shape() {
        let msg = ChatMessage {
            id: Uuid::nil(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            content: "hi".into(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(SocketEvent::ReceiveMessage(msg)).unwrap();

        assert_eq!(json["event"], "receive_message");
        assert_eq!(json["data"]["sender_id"], "a");
        assert_eq!(json["data"]["receiver_id"], "b");
        assert_eq!(json["data"]["content"], "hi");
        assert!(json["data"]["timestamp"].is_string());
    }
}

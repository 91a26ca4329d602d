use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use parley_db::{Database, StoreError};
use parley_types::events::{ChannelName, SocketCommand};
use parley_types::models::ChatMessage;

use crate::registry::{ConnectionId, ConnectionRegistry};

/// One live socket as seen by the submission path.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub conn_id: ConnectionId,
    /// Identity proven by the upgrade token, if any.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("send_message from a session without a token")]
    Unauthenticated,

    #[error("sender_id {claimed} does not match session user {actual}")]
    SenderMismatch { claimed: String, actual: Uuid },

    #[error("persisting message failed: {0}")]
    Store(#[from] StoreError),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Store plus live connections: everything a socket event needs.
#[derive(Clone)]
pub struct Gateway {
    db: Arc<Database>,
    registry: ConnectionRegistry,
}

impl Gateway {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Dispatch one client command. Failures are logged and never reach the client.
    pub async fn handle_command(&self, session: &Session, cmd: SocketCommand) {
        match cmd {
            SocketCommand::JoinUser(channel) => self.join(session, channel).await,

            SocketCommand::SendMessage {
                sender_id,
                receiver_id,
                content,
            } => {
                if let Err(e) = self.submit(session, sender_id, receiver_id, content).await {
                    match e {
                        DeliveryError::Unauthenticated | DeliveryError::SenderMismatch { .. } => {
                            warn!("conn {} dropped message: {}", session.conn_id, e)
                        }
                        _ => error!("conn {} message error: {}", session.conn_id, e),
                    }
                }
            }
        }
    }

    /// Subscribe the connection to `channel`. Any identifier is accepted.
    pub async fn join(&self, session: &Session, channel: ChannelName) {
        debug!("conn {} joining channel {}", session.conn_id, channel);
        if !self.registry.join(session.conn_id, channel).await {
            debug!("conn {} joined after teardown, ignored", session.conn_id);
        }
    }

    /// Persist a message, then push it to the receiver's and sender's channels.
    ///
    /// Nothing is delivered unless the write succeeded. The sender must be the
    /// user the session authenticated as.
    pub async fn submit(
        &self,
        session: &Session,
        sender_id: ChannelName,
        receiver_id: ChannelName,
        content: String,
    ) -> Result<ChatMessage, DeliveryError> {
        let actual = session.user_id.ok_or(DeliveryError::Unauthenticated)?;
        if sender_id.as_str() != actual.to_string() {
            return Err(DeliveryError::SenderMismatch {
                claimed: sender_id.into_string(),
                actual,
            });
        }

        // Microsecond precision so the live payload matches what history returns
        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender_id: sender_id.into_string(),
            receiver_id: receiver_id.into_string(),
            content,
            timestamp: Utc::now().trunc_subsecs(6),
        };

        // Run blocking DB insert off the async runtime
        let db = self.db.clone();
        let row = message.clone();
        tokio::task::spawn_blocking(move || db.insert_message(&row)).await??;

        let delivered = self.registry.deliver(&message).await;
        info!(
            "message {} {} -> {} delivered to {} connection(s)",
            message.id, message.sender_id, message.receiver_id, delivered
        );

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::events::SocketEvent;
    use tokio::sync::mpsc::error::TryRecvError;

    fn gateway() -> Gateway {
        Gateway::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    async fn session(gw: &Gateway, user_id: Option<Uuid>) -> (Session, tokio::sync::mpsc::UnboundedReceiver<SocketEvent>) {
        let (conn_id, rx) = gw.registry().connect().await;
        (Session { conn_id, user_id }, rx)
    }

    #[tokio::test]
    async fn send_persists_and_reaches_both_sides() {
        let gw = gateway();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (a, mut a_rx) = session(&gw, Some(alice)).await;
        let (b, mut b_rx) = session(&gw, Some(bob)).await;
        gw.join(&a, alice.into()).await;
        gw.join(&b, bob.into()).await;

        let before = Utc::now().trunc_subsecs(6);
        gw.handle_command(
            &a,
            SocketCommand::SendMessage {
                sender_id: alice.into(),
                receiver_id: bob.into(),
                content: "hi".into(),
            },
        )
        .await;

        let SocketEvent::ReceiveMessage(at_a) = a_rx.recv().await.unwrap() else {
            panic!("expected receive_message");
        };
        let SocketEvent::ReceiveMessage(at_b) = b_rx.recv().await.unwrap() else {
            panic!("expected receive_message");
        };
        assert_eq!(at_a, at_b);

        let history = gw.db.get_conversation(&alice.to_string(), &bob.to_string()).unwrap();
        assert_eq!(history.len(), 1);
        let stored = history.into_iter().next().unwrap().into_message().unwrap();
        assert_eq!(stored, at_a);
        assert_eq!(stored.content, "hi");
        assert_eq!(stored.sender_id, alice.to_string());
        assert_eq!(stored.receiver_id, bob.to_string());
        assert!(stored.timestamp >= before);
    }

    #[tokio::test]
    async fn both_connections_of_receiver_get_the_message() {
        let gw = gateway();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (a, _a_rx) = session(&gw, Some(alice)).await;
        let (b1, mut b1_rx) = session(&gw, None).await;
        let (b2, mut b2_rx) = session(&gw, None).await;
        gw.join(&b1, bob.into()).await;
        gw.join(&b2, bob.into()).await;

        let sent = gw
            .submit(&a, alice.into(), bob.into(), "twice".into())
            .await
            .unwrap();

        assert_eq!(b1_rx.recv().await.unwrap(), SocketEvent::ReceiveMessage(sent.clone()));
        assert_eq!(b2_rx.recv().await.unwrap(), SocketEvent::ReceiveMessage(sent));
    }

    #[tokio::test]
    async fn impersonation_is_dropped_before_persisting() {
        let gw = gateway();
        let mallory = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (m, _m_rx) = session(&gw, Some(mallory)).await;
        let (b, mut b_rx) = session(&gw, Some(bob)).await;
        gw.join(&b, bob.into()).await;

        let err = gw
            .submit(&m, alice.into(), bob.into(), "it's alice".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::SenderMismatch { .. }));

        assert!(gw.db.get_conversation(&alice.to_string(), &bob.to_string()).unwrap().is_empty());
        assert!(matches!(b_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn anonymous_session_cannot_send() {
        let gw = gateway();
        let (anon, _rx) = session(&gw, None).await;

        let err = gw
            .submit(&anon, "1".into(), "2".into(), "hello".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Unauthenticated));
        assert!(gw.db.get_conversation("1", "2").unwrap().is_empty());
    }

    #[tokio::test]
    async fn receiver_offline_still_persists() {
        let gw = gateway();
        let alice = Uuid::new_v4();
        let (a, _a_rx) = session(&gw, Some(alice)).await;

        gw.submit(&a, alice.into(), "nobody".into(), "anyone there?".into())
            .await
            .unwrap();

        assert_eq!(gw.db.get_conversation("nobody", &alice.to_string()).unwrap().len(), 1);
    }
}

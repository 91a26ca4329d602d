use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use parley_types::events::{ChannelName, SocketEvent};
use parley_types::models::ChatMessage;

/// Identifies one live socket connection. A user may own several.
pub type ConnectionId = Uuid;

/// Channel membership for every live connection.
///
/// `channels` and `memberships` are two views of the same relation and are
/// always updated together.
#[derive(Default)]
pub struct ChannelTable {
    /// conn_id -> outbound queue for that socket
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<SocketEvent>>,

    /// channel -> connections that joined it
    channels: HashMap<ChannelName, HashSet<ConnectionId>>,

    /// conn_id -> channels it joined, for teardown
    memberships: HashMap<ConnectionId, HashSet<ChannelName>>,
}

impl ChannelTable {
    pub fn attach(&mut self, conn_id: ConnectionId, tx: mpsc::UnboundedSender<SocketEvent>) {
        self.connections.insert(conn_id, tx);
        self.memberships.entry(conn_id).or_default();
    }

    /// Add a live connection to a channel. Joining twice is a no-op.
    /// Returns false if the connection is unknown (already torn down).
    pub fn join(&mut self, conn_id: ConnectionId, channel: ChannelName) -> bool {
        let Some(joined) = self.memberships.get_mut(&conn_id) else {
            return false;
        };
        joined.insert(channel.clone());
        self.channels.entry(channel).or_default().insert(conn_id);
        true
    }

    /// Drop a connection and every channel membership it held.
    /// Channels left without members are removed.
    pub fn detach(&mut self, conn_id: ConnectionId) {
        self.connections.remove(&conn_id);

        let Some(joined) = self.memberships.remove(&conn_id) else {
            return;
        };
        for channel in joined {
            if let Some(members) = self.channels.get_mut(&channel) {
                members.remove(&conn_id);
                if members.is_empty() {
                    self.channels.remove(&channel);
                }
            }
        }
    }

    pub fn members(&self, channel: &ChannelName) -> impl Iterator<Item = ConnectionId> + '_ {
        self.channels
            .get(channel)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    pub fn sender(&self, conn_id: ConnectionId) -> Option<&mpsc::UnboundedSender<SocketEvent>> {
        self.connections.get(&conn_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Connections that should receive `message`: everything joined to the
/// receiver's channel, then everything joined to the sender's channel.
/// Each connection appears at most once.
pub fn fan_out(table: &ChannelTable, message: &ChatMessage) -> Vec<ConnectionId> {
    let receiver = ChannelName::from(message.receiver_id.as_str());
    let sender = ChannelName::from(message.sender_id.as_str());

    let mut seen = HashSet::new();
    table
        .members(&receiver)
        .chain(table.members(&sender))
        .filter(|conn_id| seen.insert(*conn_id))
        .collect()
}

/// Shared, clonable handle over the [`ChannelTable`].
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<ChannelTable>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new socket. Returns (conn_id, receiver for its outbound events).
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<SocketEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().await.attach(conn_id, tx);
        (conn_id, rx)
    }

    pub async fn join(&self, conn_id: ConnectionId, channel: ChannelName) -> bool {
        self.inner.write().await.join(conn_id, channel)
    }

    pub async fn disconnect(&self, conn_id: ConnectionId) {
        self.inner.write().await.detach(conn_id);
    }

    /// Push `message` to every connection picked by [`fan_out`].
    /// Returns how many connections accepted it.
    pub async fn deliver(&self, message: &ChatMessage) -> usize {
        let table = self.inner.read().await;
        let mut delivered = 0;
        for conn_id in fan_out(&table, message) {
            if let Some(tx) = table.sender(conn_id) {
                if tx.send(SocketEvent::ReceiveMessage(message.clone())).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub async fn member_count(&self, channel: &ChannelName) -> usize {
        self.inner.read().await.members(channel).count()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connection_count()
    }

    pub async fn channel_count(&self) -> usize {
        self.inner.read().await.channel_count()
    }
}

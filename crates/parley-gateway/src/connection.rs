use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_types::events::{SocketCommand, SocketEvent};

use crate::delivery::{Gateway, Session};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one upgraded socket until either side goes away.
///
/// `user_id` is the identity taken from the upgrade token; `None` means the
/// client connected without one and may only join channels.
pub async fn handle_connection(socket: WebSocket, gateway: Gateway, user_id: Option<Uuid>) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut outbound_rx) = gateway.registry().connect().await;
    let session = Session { conn_id, user_id };

    match user_id {
        Some(uid) => info!("conn {} opened for user {}", conn_id, uid),
        None => info!("conn {} opened without a token", conn_id),
    }

    // Ready goes out before anything from the registry queue
    if send_event(&mut sender, &SocketEvent::Ready { user_id }).await.is_err() {
        gateway.registry().disconnect(conn_id).await;
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward fan-out events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = outbound_rx.recv() => {
                    let Some(event) = event else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("conn {} heartbeat timeout (missed {} pongs), dropping", conn_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_gateway = gateway.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<SocketCommand>(&text) {
                    Ok(cmd) => recv_gateway.handle_command(&session, cmd).await,
                    Err(e) => {
                        warn!(
                            "conn {} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    gateway.registry().disconnect(conn_id).await;
    info!("conn {} closed", conn_id);
}

async fn send_event<S>(sender: &mut S, event: &SocketEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to encode socket event: {}", e);
            return Ok(());
        }
    };
    debug!("-> {}", text.chars().take(120).collect::<String>());
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

//! One WebSocket connection: frames in, events out.

use axum::extract::ws::{Message, WebSocket};
use proctor_application::{EventRouter, OutboundEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Pumps a socket until either side closes.
///
/// Inbound text frames go to the router; everything the router queues for
/// this connection is written back in queue order.
pub async fn handle_socket(mut socket: WebSocket, router: Arc<EventRouter>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();
    let conn_id = router.connect(tx).await;
    tracing::info!("[WebSocket] Connection {} opened", conn_id);

    loop {
        tokio::select! {
            incoming = recv_text(&mut socket) => {
                match incoming {
                    Some(text) => router.handle_text(conn_id, &text).await,
                    None => break,
                }
            }
            Some(event) = rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    router.disconnect(conn_id).await;
    tracing::info!("[WebSocket] Connection {} closed", conn_id);
}

/// Next text frame, or `None` once the connection is closed or broken.
async fn recv_text(socket: &mut WebSocket) -> Option<String> {
    loop {
        match socket.recv().await? {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Close(_)) => return None,
            // Pings are answered by axum; binary frames are not part of the protocol.
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("[WebSocket] Receive error: {}", e);
                return None;
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &OutboundEvent) -> Result<(), ()> {
    let json = event.to_json().map_err(|e| {
        tracing::error!("[WebSocket] Failed to encode event: {}", e);
    })?;
    socket.send(Message::Text(json.into())).await.map_err(|e| {
        tracing::warn!("[WebSocket] Send error: {}", e);
    })
}

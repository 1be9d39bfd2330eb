// =============================================================================
// WebSocket Handler — push-based market snapshots
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate full MarketSnapshot on connect.
//   2. A fresh snapshot every 500 ms whenever the store version has changed
//      since the last push.
//
// The handler answers Ping frames with Pong and cleans up on disconnect.
// All pushed data is public market data, so no token is required.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Manages a single WebSocket connection lifecycle.
///
/// Runs two concurrent arms via `tokio::select!`:
///   1. **Push loop** — every 500 ms, check if the store version changed and
///      send a new snapshot if so.
///   2. **Recv loop** — process incoming client frames (Ping/Pong, Close).
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    use futures_util::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();

    // Send the initial full snapshot immediately.
    if let Err(e) = send_snapshot(&mut sender, &state).await {
        warn!(error = %e, "failed to send initial WebSocket snapshot");
        return;
    }
    let mut last_sent_version = state.market.current_version();

    let mut push_interval = interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            // ── Push loop: check for version changes every 500 ms ───────
            _ = push_interval.tick() => {
                let current_version = state.market.current_version();
                if current_version != last_sent_version {
                    match send_snapshot(&mut sender, &state).await {
                        Ok(()) => {
                            last_sent_version = current_version;
                        }
                        Err(e) => {
                            debug!(error = %e, "WebSocket send failed — disconnecting");
                            break;
                        }
                    }
                }
            }

            // ── Recv loop: process incoming frames ──────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        debug!("WebSocket Ping received — sending Pong");
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!("WebSocket Pong received");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received — disconnecting");
                        break;
                    }
                    Some(Ok(Message::Text(_)) | Ok(Message::Binary(_))) => {
                        // The feed is push-only; client payloads are ignored.
                        debug!("WebSocket client message ignored");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

/// Serialize and send the current MarketSnapshot over the WebSocket.
async fn send_snapshot<S>(sender: &mut S, state: &Arc<AppState>) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    use futures_util::SinkExt;

    let snapshot = state.market.snapshot();

    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(version = snapshot.version, "WebSocket snapshot sent");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "failed to serialize snapshot");
            // Serialisation errors are not network errors; don't disconnect.
            Ok(())
        }
    }
}

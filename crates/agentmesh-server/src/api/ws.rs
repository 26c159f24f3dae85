//! Live subscription channel.
//!
//! Server → client: every hub event as JSON text, plus a heartbeat after
//! each idle interval. Client → server: `ping`, `execute:<name>`, or any
//! other text (echoed).

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};

use agentmesh_core::events::{ChannelReply, HubEvent};

use crate::AppState;

pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, client_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, client_id: String) {
    let mut events = state.subscribe(&client_id).await;
    let idle = state.config.heartbeat_interval;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };
                let sent = match state.handle_channel_input(&text).await {
                    ChannelReply::Text(reply) => socket.send(Message::Text(reply.into())).await,
                    ChannelReply::Event(event) => send_event(&mut socket, &event).await,
                };
                if sent.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(idle) => {
                let heartbeat = state.heartbeat().await;
                if send_event(&mut socket, &heartbeat).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.unsubscribe(&events).await;
}

async fn send_event(socket: &mut WebSocket, event: &HubEvent) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("[WS] Failed to encode {}: {}", event.event_type(), e);
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}

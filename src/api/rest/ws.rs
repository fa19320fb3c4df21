use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, Stream, StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use crate::events::DispatchEvent;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Serialized events for one subscriber. A lagging subscriber skips what it
/// missed and keeps receiving.
pub fn live_events(rx: broadcast::Receiver<DispatchEvent>) -> impl Stream<Item = String> {
    BroadcastStream::new(rx).filter_map(|next| {
        let json = match next {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(json),
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "dashboard client lagging; events dropped");
                None
            }
        };
        future::ready(json)
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = Box::pin(live_events(state.events_tx.subscribe()));

    info!("dashboard client connected");

    let send_task = tokio::spawn(async move {
        while let Some(json) = events.next().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("dashboard client disconnected");
}

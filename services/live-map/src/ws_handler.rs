//! WebSocket handler: scene updates out, UI events in

use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::feed::BoundingBox;
use crate::map::MarkerId;

/// Events sent by the browser
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A marker was clicked
    Select { marker: MarkerId },
    /// "Clear all paths" button
    ClearPaths,
    /// The visible map bounds changed
    Viewport(BoundingBox),
    /// Pointer-drag rotation
    Rotate { bearing: f64 },
    Ping,
}

/// Handle WebSocket upgrade request
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe and snapshot under one lock so no op falls in between
    let center = state.center;
    let (mut broadcast_rx, initial) = state
        .dashboard
        .with_surface(|surface| {
            let initial = serde_json::to_string(&serde_json::json!({
                "type": "initial",
                "center": center,
                "scene": surface.scene(),
            }));
            (surface.subscribe(), initial)
        })
        .await;

    info!("New WebSocket client connected");

    match initial {
        Ok(json) => {
            if sender.send(Message::Text(json)).await.is_err() {
                return;
            }
        }
        Err(e) => {
            error!("Failed to serialize scene: {}", e);
        }
    }

    // Forward scene ops to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("WebSocket client lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // Handle UI events from the client
    let dashboard = state.dashboard.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Select { marker }) => {
                        // weather lookup must not stall the event stream
                        let dashboard = dashboard.clone();
                        tokio::spawn(async move {
                            dashboard.select_marker(marker).await;
                        });
                    }
                    Ok(ClientEvent::ClearPaths) => dashboard.clear_paths().await,
                    Ok(ClientEvent::Viewport(bbox)) => {
                        dashboard.set_viewport(bbox).await;
                    }
                    Ok(ClientEvent::Rotate { bearing }) => {
                        dashboard.rotate(bearing).await;
                    }
                    Ok(ClientEvent::Ping) => debug!("Client ping"),
                    Err(e) => warn!("Unrecognized client message {:?}: {}", text, e),
                },
                Ok(Message::Close(_)) => {
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}

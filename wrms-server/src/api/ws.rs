//! WebSocket observer transport (`GET /ws`)
//!
//! Each connection becomes one hub session. Events are written as JSON text
//! frames; anything the client sends is read only to notice that it left.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use serde::Deserialize;
use tracing::{debug, info, warn};
use wrms_common::WrmsEvent;

use super::handlers::observer_id;
use super::AppState;
use crate::error::{Error, Result};
use crate::hub::EventSink;
use crate::scheduler::{Scheduler, VoterId};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    id: Option<String>,
}

/// Session writer over the sending half of a WebSocket
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

impl EventSink for WsSink {
    async fn send_event(&mut self, event: &WrmsEvent) -> Result<()> {
        let json = event.to_json()?;
        self.sender
            .send(Message::Text(json))
            .await
            .map_err(|e| Error::Http(format!("websocket send failed: {}", e)))
    }

    async fn close(&mut self) {
        if let Err(e) = self.sender.close().await {
            debug!("Closing websocket: {}", e);
        }
    }
}

/// GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Response {
    let voter = observer_id(&headers, params.id.as_deref());
    ws.on_upgrade(move |socket| handle_socket(socket, state.scheduler, voter))
}

async fn handle_socket(socket: WebSocket, scheduler: Scheduler, voter: VoterId) {
    let Some(session) = scheduler.register(voter).await else {
        warn!("Could not open session for {}", voter);
        return;
    };
    let key = session.key;
    info!("WebSocket observer {} connected as {}", voter, key);

    let (sender, mut receiver) = socket.split();
    let client_gone = async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    let exit = scheduler
        .serve_session(session, WsSink { sender }, client_gone)
        .await;
    info!("WebSocket observer {} disconnected ({:?})", key, exit);
}

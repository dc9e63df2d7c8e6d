//! WebSocket endpoint for live metrics.
//!
//! `/api/v1/ws/metrics` authenticates the caller (token from `?token=` or the
//! `Authorization` header) before upgrading; a failed check answers 401 and
//! no socket is opened. Once connected:
//!
//! - A writer task forwards every [`HubEvent`] from the hub connection to the
//!   client as a JSON text frame.
//! - The read loop parses client frames as [`ClientEvent`]s and hands them to
//!   the connection. Malformed frames get an `error` event; the socket stays
//!   open.
//!
//! Closing the socket drops the hub connection, which stops its tickers.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use agentdeck_types::hub::{ClientEvent, HubEvent};

use crate::http::error::AppError;
use crate::http::extractors::auth::bearer_token;
use crate::state::{AppState, ConcreteHub, ConcreteHubConnection};

/// Pending outbound events per socket before tickers wait.
const OUTBOUND_BUFFER: usize = 32;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /api/v1/ws/metrics - Authenticate, then upgrade to a live metrics socket.
pub async fn metrics_ws(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user_id = match authenticate(&state, query, &headers).await {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::debug!(error = ?err, "Live metrics upgrade refused");
            return err.into_response();
        }
    };

    match ws {
        Ok(ws) => {
            let hub = state.hub.clone();
            ws.on_upgrade(move |socket| handle_metrics_socket(socket, hub, user_id))
        }
        Err(rejection) => rejection.into_response(),
    }
}

async fn authenticate(state: &AppState, query: WsQuery, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let token = match query.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => Some(token),
        None => bearer_token(headers)?,
    };
    let user = state.authenticator.authenticate(token.as_deref()).await?;
    Ok(user.id)
}

async fn handle_metrics_socket(socket: WebSocket, hub: ConcreteHub, user_id: Uuid) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<HubEvent>(OUTBOUND_BUFFER);

    let mut writer = tokio::spawn(forward_events(rx, ws_sender));
    let connection = hub.connect(user_id, tx.clone());
    let connection_id = connection.id();

    tokio::select! {
        _ = read_client_frames(ws_receiver, &connection, &tx) => {}
        _ = &mut writer => {}
    }

    connection.disconnect();
    writer.abort();
    tracing::debug!(%connection_id, "Live metrics socket closed");
}

/// Serialize hub events onto the socket until either side goes away.
async fn forward_events(mut rx: mpsc::Receiver<HubEvent>, mut ws_sender: SplitSink<WebSocket, Message>) {
    while let Some(event) = rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!("Failed to serialize HubEvent: {err}");
                continue;
            }
        };
        if ws_sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

async fn read_client_frames(
    mut ws_receiver: SplitStream<WebSocket>,
    connection: &ConcreteHubConnection,
    tx: &mpsc::Sender<HubEvent>,
) {
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match parse_client_event(&text) {
                Ok(event) => connection.handle(event).await,
                Err(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => break,
            Err(err) => {
                tracing::debug!("WebSocket receive error: {err}");
                break;
            }
            // Binary, ping and pong frames are handled by axum or ignored.
            Ok(_) => {}
        }
    }
}

/// Parse a client frame, or build the error event to send back.
fn parse_client_event(text: &str) -> Result<ClientEvent, HubEvent> {
    serde_json::from_str(text).map_err(|err| {
        tracing::debug!(raw = %text, error = %err, "Malformed live metrics frame");
        HubEvent::error(format!("malformed message: {err}"))
    })
}

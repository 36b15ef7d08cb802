//! Real-time delivery session endpoint.
//!
//! `GET /ws` upgrades to a WebSocket and registers the caller in the
//! session registry. The pump forwards gateway payloads to the socket and
//! answers pings; inbound frames carry no mutations (those go over HTTP).

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::middleware::guards::AuthedUser;
use crate::state::AppState;

pub async fn ws_handler(
    State(state): State<AppState>,
    user: AuthedUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_session(state, user.id, socket))
}

async fn handle_session(state: AppState, user_id: Uuid, socket: WebSocket) {
    let (session_id, mut rx) = state.gateway.register(user_id).await;
    tracing::debug!(%user_id, "realtime session opened");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            delivery = rx.recv() => match delivery {
                Some(payload) => {
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                // Channel closed: a newer session replaced this one.
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.gateway.unregister(user_id, session_id).await;
    tracing::debug!(%user_id, "realtime session closed");
}

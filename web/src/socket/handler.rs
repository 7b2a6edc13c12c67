use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use log::*;
use std::sync::Arc;
use ws::consumer::{Consumer, DisconnectReason};
use ws::{GroupName, Manager};

/// Websocket endpoint that subscribes the client to `product_group`.
pub(crate) async fn product_notifications(
    State(app_state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let manager = app_state.ws_manager.clone();
    ws.on_upgrade(move |socket| serve_group(socket, manager, GroupName::products()))
}

/// Websocket endpoint that subscribes the client to the group named in the path.
pub(crate) async fn group_notifications(
    Path(group): Path<String>,
    State(app_state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let group = match GroupName::parse(&group) {
        Ok(group) => group,
        Err(err) => {
            debug!("Rejecting websocket subscription: {err}");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let manager = app_state.ws_manager.clone();
    ws.on_upgrade(move |socket| serve_group(socket, manager, group))
}

/// Drives one websocket connection from handshake to close. Group events are
/// written by a dedicated task while this one watches the inbound side; when
/// either side finishes the consumer leaves its group.
async fn serve_group(socket: WebSocket, manager: Arc<Manager>, group: GroupName) {
    let (mut consumer, mut events) = Consumer::connect(manager, group);
    debug!(
        "Websocket upgraded for connection {} in group {}",
        consumer.connection_id(),
        consumer.group()
    );

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = match Consumer::render(&event) {
                Ok(frame) => frame,
                Err(err) => {
                    error!("Failed to render {} event: {err}", event.kind.handler_name());
                    continue;
                }
            };

            if let Err(err) = sink.send(Message::Text(frame)).await {
                return DisconnectReason::TransportError(err.to_string());
            }
        }

        // The group queue closes once the consumer leaves. Closing the sink
        // flushes the reply to a client close frame, or sends our own.
        if let Err(err) = sink.close().await {
            trace!("Close frame not delivered: {err}");
        }
        DisconnectReason::StreamEnded
    });

    let (reason, send_task_done) = tokio::select! {
        sent = &mut send_task => match sent {
            Ok(reason) => (reason, true),
            Err(err) => (DisconnectReason::TransportError(err.to_string()), true),
        },
        reason = read_until_closed(&mut stream) => (reason, false),
    };

    // Leaving the group drops the queue's only sender, which lets a running
    // send task drain and flush its close frame.
    consumer.disconnect(reason);

    if !send_task_done {
        if let Err(err) = send_task.await {
            warn!("Websocket send task failed: {err}");
        }
    }
}

async fn read_until_closed(stream: &mut SplitStream<WebSocket>) -> DisconnectReason {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(frame)) => {
                return DisconnectReason::ClientClosed(frame.map(|frame| frame.code))
            }
            // Subscribers only listen; anything else they send is ignored.
            Ok(_) => trace!("Ignoring inbound websocket message"),
            Err(err) => return DisconnectReason::TransportError(err.to_string()),
        }
    }
    DisconnectReason::StreamEnded
}

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use marquee_core::{auth, broadcaster, resolver, AppState};
use marquee_models::gateway::*;
use serde_json::json;
use tokio::time::{Duration, Instant};

use crate::session::Session;

const IDENTIFY_TIMEOUT_SECS: u64 = 30;

async fn send_ws_text(
    sender: &mut (impl SinkExt<Message> + Unpin),
    payload: String,
) -> Result<(), ()> {
    sender
        .send(Message::Text(payload.into()))
        .await
        .map_err(|_| ())
}

/// Faults are visible only to the invoking connection; they never go
/// through the event bus.
async fn send_fault(
    sender: &mut (impl SinkExt<Message> + Unpin),
    session: &Session,
    err: &marquee_core::error::CoreError,
) {
    tracing::debug!(
        user_id = session.user_id,
        connection_id = %session.connection_id,
        code = err.code(),
        "gateway call failed"
    );
    let payload = json!({
        "op": OP_DISPATCH,
        "t": EVENT_ERROR,
        "d": {
            "code": err.code(),
            "message": err.to_string(),
        }
    });
    let _ = send_ws_text(sender, payload.to_string()).await;
}

pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Send HELLO
    let hello = json!({
        "op": OP_HELLO,
        "d": { "heartbeat_interval": state.config.heartbeat_interval_ms }
    });
    if send_ws_text(&mut sender, hello.to_string()).await.is_err() {
        return;
    }

    // Wait for IDENTIFY
    let identify_timeout = Duration::from_secs(IDENTIFY_TIMEOUT_SECS);
    let session = match tokio::time::timeout(
        identify_timeout,
        wait_for_identify(&mut receiver, &state),
    )
    .await
    {
        Ok(Some(session)) => session,
        _ => {
            let _ = send_ws_text(
                &mut sender,
                json!({"op": OP_INVALID_SESSION, "d": false}).to_string(),
            )
            .await;
            return;
        }
    };

    let ready = json!({
        "op": OP_DISPATCH,
        "t": EVENT_READY,
        "d": {
            "connection_id": &session.connection_id,
            "user_id": session.user_id.to_string(),
        }
    });
    if send_ws_text(&mut sender, ready.to_string()).await.is_err() {
        return;
    }
    tracing::info!(
        user_id = session.user_id,
        connection_id = %session.connection_id,
        "gateway connection established"
    );

    let disconnect_reason = run_session(sender, receiver, &session, state.clone()).await;

    // Terminal state: drop the connection from every broadcast group.
    state.registry.remove(&session.connection_id);
    tracing::info!(
        user_id = session.user_id,
        connection_id = %session.connection_id,
        "client disconnected: {disconnect_reason}"
    );
}

async fn wait_for_identify(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    state: &AppState,
) -> Option<Session> {
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            let Ok(frame) = serde_json::from_str::<GatewayMessage>(&text) else {
                continue;
            };
            if frame.op != OP_IDENTIFY {
                continue;
            }
            let token = frame
                .d
                .as_ref()
                .and_then(|d| d.get("token"))
                .and_then(|v| v.as_str())?;
            let claims = auth::validate_token(token, &state.config.jwt_secret).ok()?;
            return Some(Session::new(claims.sub));
        }
    }
    None
}

async fn run_session(
    mut sender: impl SinkExt<Message> + Unpin,
    mut receiver: impl StreamExt<Item = Result<Message, axum::Error>> + Unpin,
    session: &Session,
    state: AppState,
) -> String {
    let mut event_rx = state.event_bus.subscribe();
    let heartbeat_timeout = Duration::from_millis(state.config.heartbeat_timeout_ms);
    let heartbeat_sleep = tokio::time::sleep(heartbeat_timeout);
    tokio::pin!(heartbeat_sleep);

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(frame) = serde_json::from_str::<GatewayMessage>(&text) else {
                            continue;
                        };
                        let op = frame.op;
                        handle_client_message(&frame, &mut sender, session, &state).await;
                        if op == OP_HEARTBEAT {
                            heartbeat_sleep.as_mut().reset(Instant::now() + heartbeat_timeout);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break if let Some(frame) = frame {
                            format!("client close frame (code={}, reason={})", frame.code, frame.reason)
                        } else {
                            "client close frame (no code/reason)".to_string()
                        };
                    }
                    Some(Err(err)) => {
                        break format!("websocket receive error: {err}");
                    }
                    None => {
                        break "websocket stream ended".to_string();
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if !session.should_receive_event(&event.target_connection_ids) {
                            continue;
                        }
                        let dispatch = json!({
                            "op": OP_DISPATCH,
                            "t": event.event_type,
                            "d": event.payload,
                        });
                        if send_ws_text(&mut sender, dispatch.to_string()).await.is_err() {
                            break "websocket send error".to_string();
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            user_id = session.user_id,
                            skipped,
                            "gateway event stream lagged; forcing reconnect"
                        );
                        break format!("event stream lagged by {skipped} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break "event stream closed".to_string();
                    }
                }
            }
            () = &mut heartbeat_sleep => {
                break format!("heartbeat timeout after {}ms", state.config.heartbeat_timeout_ms);
            }
        }
    }
}

async fn handle_client_message(
    frame: &GatewayMessage,
    sender: &mut (impl SinkExt<Message> + Unpin),
    session: &Session,
    state: &AppState,
) {
    match frame.op {
        OP_HEARTBEAT => {
            let _ = send_ws_text(sender, json!({"op": OP_HEARTBEAT_ACK}).to_string()).await;
        }
        OP_JOIN_CONVERSATION => {
            let Some(d) = frame.d.as_ref() else { return };
            let Ok(req) = serde_json::from_value::<JoinConversationRequest>(d.clone()) else {
                return;
            };
            tracing::debug!(
                user_id = session.user_id,
                event_id = req.event_id,
                host_id = req.host_id,
                "join requested"
            );
            match resolver::resolve(state, req.event_id, req.host_id, req.user_id).await {
                Ok(view) => {
                    broadcaster::announce_join(state, &session.connection_id, &view);
                }
                Err(err) => send_fault(sender, session, &err).await,
            }
        }
        OP_SEND_MESSAGE => {
            let Some(d) = frame.d.as_ref() else { return };
            let Ok(req) = serde_json::from_value::<SendMessageRequest>(d.clone()) else {
                return;
            };
            tracing::debug!(
                user_id = session.user_id,
                conversation_id = req.conversation_id,
                "send requested"
            );
            if let Err(err) = broadcaster::send(state, &session.connection_id, &req).await {
                send_fault(sender, session, &err).await;
            }
        }
        _ => {
            tracing::debug!("Unknown opcode {} from client {}", frame.op, session.user_id);
        }
    }
}

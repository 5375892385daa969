//! Conversation stream WebSocket handler
//!
//! One socket streams one conversation. Envelopes reach the client through a
//! [`StreamSession`]; frames sent by the client are handled on the same
//! connection.

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::PathRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use courier_messenger::{
    Envelope, EnvelopeSink, MessengerError, NewEnvelope, SessionEnd, StreamSession,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{ClientEvent, ServerEvent};
use crate::error::{GatewayError, GatewayResult};
use crate::rest::EnvelopeResponse;
use crate::state::GatewayState;

/// How long a reply may wait for room in the outbound queue.
const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// How long the writer gets to flush and close before it is aborted.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Upgrade to a stream of the conversation's envelopes.
///
/// Unknown conversations are refused with 404 before the upgrade.
pub async fn conversation_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> GatewayResult<Response> {
    let Path(conversation_id) = path?;
    state.pipeline.ensure_conversation(conversation_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_conversation_socket(socket, state, conversation_id)))
}

/// Relays envelopes into the connection's outbound queue.
struct ChannelSink {
    out_tx: mpsc::Sender<ServerEvent>,
}

#[async_trait]
impl EnvelopeSink for ChannelSink {
    type Error = String;

    async fn send(&mut self, envelope: &Envelope) -> Result<(), String> {
        let event = ServerEvent::Envelope {
            envelope: EnvelopeResponse::from(envelope),
        };
        self.out_tx
            .send(event)
            .await
            .map_err(|_| "websocket writer closed".to_string())
    }
}

enum Step {
    RelayEnded(Result<SessionEnd, JoinError>),
    Incoming(Option<Result<Message, axum::Error>>),
}

async fn handle_conversation_socket(
    socket: WebSocket,
    state: Arc<GatewayState>,
    conversation_id: Uuid,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(state.subscriber_buffer.max(1));

    // Single writer owns the socket sink; closing the queue closes the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "failed to encode server event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let cancel = state.shutdown.child_token();
    let mut session = StreamSession::open(
        state.registry.clone(),
        conversation_id,
        cancel.clone(),
        state.subscriber_buffer,
    );

    let handle = match session.activate() {
        Ok(handle) => handle,
        Err(error) => {
            let _ = out_tx.try_send(ServerEvent::from(&GatewayError::from(error)));
            drain_writer(out_tx, writer).await;
            return;
        }
    };

    let subscribed = ServerEvent::Subscribed {
        conversation_id,
        subscription: handle.id.to_string(),
    };
    if !reply(&out_tx, subscribed).await {
        cancel.cancel();
        drop(session);
        drain_writer(out_tx, writer).await;
        return;
    }

    let mut sink = ChannelSink {
        out_tx: out_tx.clone(),
    };
    let mut relay = tokio::spawn(async move { session.run(&mut sink).await });

    let end = loop {
        let step = tokio::select! {
            finished = &mut relay => Step::RelayEnded(finished),
            incoming = ws_receiver.next() => Step::Incoming(incoming),
        };

        let text = match step {
            Step::RelayEnded(finished) => {
                break finished.unwrap_or_else(|error| SessionEnd::TransportFailed(error.to_string()))
            }
            Step::Incoming(Some(Ok(Message::Text(text)))) => text,
            Step::Incoming(Some(Ok(Message::Close(_)))) | Step::Incoming(None) => {
                debug!(%conversation_id, "client closed the stream");
                break leave(&cancel, relay).await;
            }
            Step::Incoming(Some(Ok(_))) => continue,
            Step::Incoming(Some(Err(error))) => {
                debug!(%conversation_id, %error, "websocket receive failed");
                break leave(&cancel, relay).await;
            }
        };

        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(error) => {
                let invalid = GatewayError::InvalidRequest(format!("unreadable frame: {error}"));
                if !reply(&out_tx, ServerEvent::from(&invalid)).await {
                    break leave(&cancel, relay).await;
                }
                continue;
            }
        };

        match event {
            ClientEvent::Ping => {
                if !reply(&out_tx, ServerEvent::Pong).await {
                    break leave(&cancel, relay).await;
                }
            }
            ClientEvent::Send { sender, body } => {
                let outcome = match state
                    .pipeline
                    .submit(NewEnvelope::new(sender, conversation_id, body))
                    .await
                {
                    Ok(envelope) => ServerEvent::Sent {
                        envelope_id: envelope.id,
                    },
                    Err(error) => ServerEvent::from(&GatewayError::from(error)),
                };
                if !reply(&out_tx, outcome).await {
                    break leave(&cancel, relay).await;
                }
            }
            ClientEvent::Unsubscribe => {
                let end = leave(&cancel, relay).await;
                reply(&out_tx, ServerEvent::Unsubscribed { conversation_id }).await;
                break end;
            }
        }
    };

    match &end {
        SessionEnd::Evicted => {
            let error = GatewayError::from(MessengerError::stream_terminated(
                "subscriber fell behind and was disconnected",
            ));
            // The queue is usually full when a subscriber is evicted.
            if out_tx.try_send(ServerEvent::from(&error)).is_err() {
                debug!(%conversation_id, "eviction notice dropped, outbound queue full");
            }
        }
        SessionEnd::Cancelled | SessionEnd::TransportFailed(_) => {}
    }

    drain_writer(out_tx, writer).await;
    info!(%conversation_id, subscription = %handle.id, end = ?end, "conversation stream closed");
}

/// Queue a frame for the writer. `false` when the writer is gone or has
/// not made room within [`REPLY_TIMEOUT`].
async fn reply(out_tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
    matches!(
        tokio::time::timeout(REPLY_TIMEOUT, out_tx.send(event)).await,
        Ok(Ok(()))
    )
}

/// Close the outbound queue and give the writer a bounded time to flush.
/// A writer stuck on a client that stopped reading is aborted, which drops
/// the socket.
async fn drain_writer(out_tx: mpsc::Sender<ServerEvent>, mut writer: JoinHandle<()>) {
    drop(out_tx);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        warn!("websocket writer did not drain in time, aborting");
        writer.abort();
    }
}

/// Cancel the session and wait for its relay task to deregister.
async fn leave(cancel: &CancellationToken, relay: JoinHandle<SessionEnd>) -> SessionEnd {
    cancel.cancel();
    relay
        .await
        .unwrap_or_else(|error| SessionEnd::TransportFailed(error.to_string()))
}

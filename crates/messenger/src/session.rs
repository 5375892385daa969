//! Lifecycle of one streaming subscriber.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entities::{ConversationId, Envelope};
use crate::error::{MessengerError, MessengerResult};
use crate::registry::{Subscriber, SubscriptionHandle, SubscriptionRegistry};

/// Transport the session relays envelopes to (a WebSocket writer, a test
/// collector, ...).
#[async_trait]
pub trait EnvelopeSink: Send {
    type Error: fmt::Display + Send;

    async fn send(&mut self, envelope: &Envelope) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Active,
    /// The subscription was cancelled or evicted and is already out of the
    /// registry; `run` has not finished winding the session down yet.
    Closing,
    Closed,
}

/// Why [`StreamSession::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The session's token fired (client left, unsubscribe, shutdown).
    Cancelled,
    /// The registry disconnected the subscriber.
    Evicted,
    /// Writing to the transport failed. Not retried.
    TransportFailed(String),
}

/// Deregisters when dropped, whichever way the session ends. The watcher
/// removes the subscription as soon as its token fires, even if nobody is
/// running the session.
struct Registration {
    registry: Arc<SubscriptionRegistry>,
    handle: SubscriptionHandle,
    watcher: JoinHandle<()>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.watcher.abort();
        self.registry.deregister(&self.handle);
    }
}

async fn deregister_on_cancel(
    registry: Arc<SubscriptionRegistry>,
    handle: SubscriptionHandle,
    token: CancellationToken,
) {
    token.cancelled().await;
    if registry.deregister(&handle) {
        debug!(subscription = %handle.id, "cancelled subscription removed before relay");
    }
}

pub struct StreamSession {
    registry: Arc<SubscriptionRegistry>,
    conversation_id: ConversationId,
    cancel: CancellationToken,
    buffer: usize,
    state: SessionState,
    subscriber_token: Option<CancellationToken>,
    receiver: Option<mpsc::Receiver<Envelope>>,
    registration: Option<Registration>,
}

impl StreamSession {
    /// Prepare a session; nothing is registered until [`activate`](Self::activate).
    pub fn open(
        registry: Arc<SubscriptionRegistry>,
        conversation_id: ConversationId,
        cancel: CancellationToken,
        buffer: usize,
    ) -> Self {
        Self {
            registry,
            conversation_id,
            cancel,
            buffer: buffer.max(1),
            state: SessionState::Opening,
            subscriber_token: None,
            receiver: None,
            registration: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.subscriber_token {
            Some(token) if self.state == SessionState::Active && token.is_cancelled() => {
                SessionState::Closing
            }
            _ => self.state,
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.registration.as_ref().map(|registration| registration.handle)
    }

    /// Register with the registry and start receiving envelopes.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn activate(&mut self) -> MessengerResult<SubscriptionHandle> {
        if self.state != SessionState::Opening {
            return Err(MessengerError::stream_terminated("session is not opening"));
        }
        if self.cancel.is_cancelled() {
            self.state = SessionState::Closed;
            return Err(MessengerError::stream_terminated(
                "session cancelled before activation",
            ));
        }

        let Ok(runtime) = Handle::try_current() else {
            self.state = SessionState::Closed;
            return Err(MessengerError::stream_terminated(
                "no runtime available to watch the subscription",
            ));
        };

        let (sender, receiver) = mpsc::channel(self.buffer);
        let subscriber_token = self.cancel.child_token();
        let handle = match self.registry.register(
            self.conversation_id,
            Subscriber::new(sender, subscriber_token.clone()),
        ) {
            Ok(handle) => handle,
            Err(error) => {
                self.state = SessionState::Closed;
                return Err(error);
            }
        };

        let watcher = runtime.spawn(deregister_on_cancel(
            self.registry.clone(),
            handle,
            subscriber_token.clone(),
        ));
        self.registration = Some(Registration {
            registry: self.registry.clone(),
            handle,
            watcher,
        });
        self.subscriber_token = Some(subscriber_token);
        self.receiver = Some(receiver);
        self.state = SessionState::Active;

        info!(conversation_id = %self.conversation_id, subscription = %handle.id, "stream session active");
        Ok(handle)
    }

    /// Relay envelopes to `transport` until the session ends.
    ///
    /// A session that was never activated ends immediately as cancelled.
    pub async fn run<T: EnvelopeSink>(&mut self, transport: &mut T) -> SessionEnd {
        let (Some(mut receiver), Some(subscriber_token)) =
            (self.receiver.take(), self.subscriber_token.clone())
        else {
            self.state = SessionState::Closed;
            return SessionEnd::Cancelled;
        };

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionEnd::Cancelled,
                _ = subscriber_token.cancelled() => break SessionEnd::Evicted,
                next = receiver.recv() => next,
            };

            let Some(envelope) = next else {
                break SessionEnd::Evicted;
            };

            let written = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionEnd::Cancelled,
                _ = subscriber_token.cancelled() => break SessionEnd::Evicted,
                written = transport.send(&envelope) => written,
            };

            match written {
                Ok(()) => debug!(envelope_id = %envelope.id, "envelope relayed"),
                Err(error) => break SessionEnd::TransportFailed(error.to_string()),
            }
        };

        self.close();

        match &end {
            SessionEnd::Cancelled => {
                info!(conversation_id = %self.conversation_id, "stream session cancelled")
            }
            SessionEnd::Evicted => {
                warn!(conversation_id = %self.conversation_id, "stream session evicted")
            }
            SessionEnd::TransportFailed(reason) => {
                warn!(conversation_id = %self.conversation_id, %reason, "stream transport failed")
            }
        }
        end
    }

    fn close(&mut self) {
        self.receiver = None;
        self.registration = None;
        self.state = SessionState::Closed;
    }
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("conversation_id", &self.conversation_id)
            .field("state", &self.state)
            .field("handle", &self.handle())
            .finish()
    }
}

//! Subscription registry for real-time envelope fan-out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use courier_config::OverflowPolicy;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entities::{ConversationId, Envelope};
use crate::error::{MessengerError, MessengerResult};

/// Identifier of one registration, unique for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Output side of one subscriber: a bounded queue plus its liveness signal.
#[derive(Debug, Clone)]
pub struct Subscriber {
    sender: mpsc::Sender<Envelope>,
    token: CancellationToken,
}

impl Subscriber {
    pub fn new(sender: mpsc::Sender<Envelope>, token: CancellationToken) -> Self {
        Self { sender, token }
    }

    fn is_gone(&self) -> bool {
        self.token.is_cancelled() || self.sender.is_closed()
    }
}

/// Returned by [`SubscriptionRegistry::register`]; needed to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub conversation_id: ConversationId,
    pub id: SubscriptionId,
}

/// Outcome of a single broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers whose queue accepted the envelope.
    pub delivered: usize,
    /// Subscribers that skipped the envelope because their queue was full.
    pub dropped: usize,
    /// Subscribers removed because their queue was full.
    pub evicted: usize,
    /// Subscribers removed because they had already gone away.
    pub pruned: usize,
}

/// Concurrency-safe map from conversation to its live subscribers.
///
/// All mutation and iteration of one conversation's subscribers happens under
/// that key's shard lock, so registration, removal and broadcast never race.
/// Broadcast never awaits.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    conversations: DashMap<ConversationId, Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
    overflow_policy: OverflowPolicy,
}

impl SubscriptionRegistry {
    pub fn new(overflow_policy: OverflowPolicy) -> Self {
        Self {
            conversations: DashMap::new(),
            next_id: AtomicU64::new(1),
            overflow_policy,
        }
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Add a subscriber to a conversation.
    ///
    /// Refused with [`MessengerError::StreamTerminated`] when the subscriber
    /// is already cancelled or its receiver dropped.
    pub fn register(
        &self,
        conversation_id: ConversationId,
        subscriber: Subscriber,
    ) -> MessengerResult<SubscriptionHandle> {
        if subscriber.is_gone() {
            return Err(MessengerError::stream_terminated(
                "subscriber cancelled before registration",
            ));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entry = self.conversations.entry(conversation_id).or_default();
        entry.push((id, subscriber));
        let subscribers = entry.len();
        drop(entry);

        info!(%conversation_id, subscription = %id, subscribers, "subscriber registered");
        Ok(SubscriptionHandle {
            conversation_id,
            id,
        })
    }

    /// Remove exactly the subscriber behind `handle`. Returns whether it was
    /// still registered; calling this again is a no-op.
    pub fn deregister(&self, handle: &SubscriptionHandle) -> bool {
        let removed = match self.conversations.get_mut(&handle.conversation_id) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|(id, _)| *id != handle.id);
                before != entry.len()
            }
            None => false,
        };

        self.remove_if_empty(&handle.conversation_id);

        if removed {
            info!(
                conversation_id = %handle.conversation_id,
                subscription = %handle.id,
                "subscriber deregistered"
            );
        }
        removed
    }

    /// Offer `envelope` to every subscriber registered for `conversation_id`
    /// at the moment of the call.
    pub fn broadcast(&self, conversation_id: ConversationId, envelope: &Envelope) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let Some(mut entry) = self.conversations.get_mut(&conversation_id) else {
            return report;
        };

        let overflow_policy = self.overflow_policy;
        entry.retain(|(id, subscriber)| {
            if subscriber.is_gone() {
                report.pruned += 1;
                return false;
            }

            match subscriber.sender.try_send(envelope.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => match overflow_policy {
                    OverflowPolicy::Disconnect => {
                        warn!(%conversation_id, subscription = %id, "subscriber queue full, disconnecting");
                        subscriber.token.cancel();
                        report.evicted += 1;
                        false
                    }
                    OverflowPolicy::Drop => {
                        warn!(%conversation_id, subscription = %id, envelope_id = %envelope.id, "subscriber queue full, dropping envelope");
                        report.dropped += 1;
                        true
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    report.pruned += 1;
                    false
                }
            }
        });
        drop(entry);

        self.remove_if_empty(&conversation_id);

        debug!(
            %conversation_id,
            envelope_id = %envelope.id,
            delivered = report.delivered,
            dropped = report.dropped,
            evicted = report.evicted,
            pruned = report.pruned,
            "broadcast complete"
        );
        report
    }

    pub fn subscriber_count(&self, conversation_id: &ConversationId) -> usize {
        self.conversations
            .get(conversation_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Number of conversations with at least one subscriber.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    fn remove_if_empty(&self, conversation_id: &ConversationId) {
        self.conversations
            .remove_if(conversation_id, |_, subscribers| subscribers.is_empty());
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

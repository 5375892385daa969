//! Persist-then-broadcast delivery of envelopes.

use std::sync::Arc;

use courier_config::DeliveryConfig;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::conflict::{insert_with_retry, storage_failure};
use crate::entities::{ConversationId, Envelope, NewEnvelope};
use crate::error::{MessengerError, MessengerResult};
use crate::ids::IdGenerator;
use crate::registry::SubscriptionRegistry;
use crate::store::ConversationStore;

/// Limits applied by the pipeline, usually taken from [`DeliveryConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub max_insert_attempts: u32,
    pub max_body_len: usize,
    pub history_limit: u32,
}

impl From<&DeliveryConfig> for PipelineSettings {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            max_insert_attempts: config.max_insert_attempts,
            max_body_len: config.max_body_len,
            history_limit: config.history_limit,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}

/// Serializes persist and broadcast per conversation so subscribers observe
/// envelopes in commit order.
pub struct DeliveryPipeline<S> {
    store: Arc<S>,
    registry: Arc<SubscriptionRegistry>,
    ids: Arc<dyn IdGenerator>,
    settings: PipelineSettings,
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl<S: ConversationStore> DeliveryPipeline<S> {
    pub fn new(
        store: Arc<S>,
        registry: Arc<SubscriptionRegistry>,
        ids: Arc<dyn IdGenerator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            registry,
            ids,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Persist an envelope and fan it out to the conversation's subscribers.
    ///
    /// Nothing is broadcast unless the insert succeeded.
    pub async fn submit(&self, envelope: NewEnvelope) -> MessengerResult<Envelope> {
        self.validate(&envelope)?;
        let conversation_id = envelope.conversation_id;

        let lock = self
            .locks
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.persist_and_broadcast(&envelope).await
        };

        drop(lock);
        self.locks
            .remove_if(&conversation_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn persist_and_broadcast(&self, envelope: &NewEnvelope) -> MessengerResult<Envelope> {
        let store = &self.store;
        let persisted = insert_with_retry(
            self.ids.as_ref(),
            self.settings.max_insert_attempts,
            |id| async move { store.insert_envelope(id, envelope).await },
        )
        .await?;

        info!(
            conversation_id = %persisted.conversation_id,
            envelope_id = %persisted.id,
            sender_id = %persisted.sender_id,
            "envelope persisted"
        );

        let report = self
            .registry
            .broadcast(persisted.conversation_id, &persisted);
        debug!(envelope_id = %persisted.id, delivered = report.delivered, "envelope fanned out");

        Ok(persisted)
    }

    /// The most recent envelopes of a conversation, oldest first, capped at
    /// the configured history limit.
    pub async fn history(
        &self,
        conversation_id: ConversationId,
        limit: Option<u32>,
    ) -> MessengerResult<Vec<Envelope>> {
        let limit = limit
            .unwrap_or(self.settings.history_limit)
            .min(self.settings.history_limit)
            .max(1);

        self.ensure_conversation(conversation_id).await?;

        self.store
            .list_envelopes(conversation_id, limit)
            .await
            .map_err(storage_failure)
    }

    /// Fail with [`MessengerError::NotFound`] unless the conversation exists.
    pub async fn ensure_conversation(&self, conversation_id: ConversationId) -> MessengerResult<()> {
        match self
            .store
            .find_conversation(conversation_id)
            .await
            .map_err(storage_failure)?
        {
            Some(_) => Ok(()),
            None => Err(MessengerError::not_found("conversation", conversation_id)),
        }
    }

    fn validate(&self, envelope: &NewEnvelope) -> MessengerResult<()> {
        if envelope.body.trim().is_empty() {
            return Err(MessengerError::invalid_input("envelope body must not be empty"));
        }
        if envelope.body.len() > self.settings.max_body_len {
            return Err(MessengerError::invalid_input(format!(
                "envelope body exceeds {} bytes",
                self.settings.max_body_len
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

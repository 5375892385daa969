//! Conversation service for creating and listing conversations.

use std::sync::Arc;

use tracing::info;

use crate::conflict::{insert_with_retry, storage_failure};
use crate::entities::{Conversation, ConversationId, NewConversation, UserId};
use crate::error::{MessengerError, MessengerResult};
use crate::ids::IdGenerator;
use crate::store::ConversationStore;
use crate::utils::dedupe_members;

/// Service for managing conversations
pub struct ConversationService<S> {
    store: Arc<S>,
    ids: Arc<dyn IdGenerator>,
    max_insert_attempts: u32,
}

impl<S: ConversationStore> ConversationService<S> {
    pub fn new(store: Arc<S>, ids: Arc<dyn IdGenerator>, max_insert_attempts: u32) -> Self {
        Self {
            store,
            ids,
            max_insert_attempts,
        }
    }

    /// Create a conversation between at least two distinct recipients.
    pub async fn create_conversation(
        &self,
        request: NewConversation,
    ) -> MessengerResult<Conversation> {
        let members = dedupe_members(&request.recipients)?;

        let store = &self.store;
        let members = members.as_slice();
        let conversation =
            insert_with_retry(self.ids.as_ref(), self.max_insert_attempts, |id| async move {
                store.insert_conversation(id, members).await
            })
            .await?;

        info!(
            conversation_id = %conversation.id,
            members = conversation.members.len(),
            "conversation created"
        );
        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: ConversationId) -> MessengerResult<Conversation> {
        self.store
            .find_conversation(id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| MessengerError::not_found("conversation", id))
    }

    /// Conversations the member belongs to, newest first. Empty when none.
    pub async fn list_conversations(&self, member: UserId) -> MessengerResult<Vec<Conversation>> {
        self.store
            .list_conversations(member)
            .await
            .map_err(storage_failure)
    }
}

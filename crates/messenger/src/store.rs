//! Storage seams used by the pipeline and services.
//!
//! Implementations return their own error type; the conflict layer inspects
//! it through [`Classify`] to decide whether a failed insert may be retried.

use async_trait::async_trait;

use crate::conflict::Classify;
use crate::entities::{
    Contact, ContactId, Conversation, ConversationId, Envelope, EnvelopeId, NewContact,
    NewEnvelope, NewUserRecord, User, UserId, UserUpdate,
};

#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    type Error: Classify + std::error::Error + Send + Sync + 'static;

    /// Insert a conversation with the given identifier and member list.
    async fn insert_conversation(
        &self,
        id: ConversationId,
        members: &[UserId],
    ) -> Result<Conversation, Self::Error>;

    /// Insert an envelope with the given identifier. Fails with a
    /// not-found classification if the conversation does not exist.
    async fn insert_envelope(
        &self,
        id: EnvelopeId,
        envelope: &NewEnvelope,
    ) -> Result<Envelope, Self::Error>;

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, Self::Error>;

    /// Conversations the member belongs to, newest first.
    async fn list_conversations(&self, member: UserId) -> Result<Vec<Conversation>, Self::Error>;

    /// The most recent `limit` envelopes of a conversation, returned in
    /// ascending creation order.
    async fn list_envelopes(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<Envelope>, Self::Error>;
}

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    type Error: Classify + std::error::Error + Send + Sync + 'static;

    async fn insert_user(&self, id: UserId, user: &NewUserRecord) -> Result<User, Self::Error>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, Self::Error>;

    /// Replace username and email. `None` when the user does not exist.
    async fn update_user(
        &self,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<Option<User>, Self::Error>;

    /// Users whose username or email contains `query`, ignoring case,
    /// ordered by username.
    async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<User>, Self::Error>;
}

#[async_trait]
pub trait ContactStore: Send + Sync + 'static {
    type Error: Classify + std::error::Error + Send + Sync + 'static;

    /// Insert a contact with the given identifier. Fails with a not-found
    /// classification when either user does not exist.
    async fn insert_contact(
        &self,
        id: ContactId,
        contact: &NewContact,
    ) -> Result<Contact, Self::Error>;

    async fn find_contact(&self, id: ContactId) -> Result<Option<Contact>, Self::Error>;

    /// The owner's contacts, oldest first.
    async fn list_contacts(&self, owner: UserId) -> Result<Vec<Contact>, Self::Error>;

    /// The owner's contacts whose recipient username or email contains
    /// `query`, ignoring case.
    async fn search_contacts(
        &self,
        owner: UserId,
        query: &str,
    ) -> Result<Vec<Contact>, Self::Error>;

    /// Remove a contact. Returns whether a row was deleted.
    async fn delete_contact(&self, id: ContactId) -> Result<bool, Self::Error>;
}

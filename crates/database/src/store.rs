//! SQLite-backed implementation of the messenger storage traits.

use async_trait::async_trait;
use courier_messenger::{
    Contact, ContactId, ContactStore, Conversation, ConversationId, ConversationStore, Envelope,
    EnvelopeId, NewContact, NewEnvelope, NewUserRecord, User, UserId, UserStore, UserUpdate,
};
use sqlx::SqlitePool;

use crate::repos::{
    ContactRepository, ConversationRepository, EnvelopeRepository, UserRepository,
};
use crate::types::DatabaseError;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    users: UserRepository,
    conversations: ConversationRepository,
    envelopes: EnvelopeRepository,
    contacts: ContactRepository,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            conversations: ConversationRepository::new(pool.clone()),
            envelopes: EnvelopeRepository::new(pool.clone()),
            contacts: ContactRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    type Error = DatabaseError;

    async fn insert_conversation(
        &self,
        id: ConversationId,
        members: &[UserId],
    ) -> Result<Conversation, DatabaseError> {
        self.conversations.create(id, members).await
    }

    async fn insert_envelope(
        &self,
        id: EnvelopeId,
        envelope: &NewEnvelope,
    ) -> Result<Envelope, DatabaseError> {
        self.envelopes.create(id, envelope).await
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, DatabaseError> {
        self.conversations.find_by_id(id).await
    }

    async fn list_conversations(&self, member: UserId) -> Result<Vec<Conversation>, DatabaseError> {
        self.conversations.list_by_member(member).await
    }

    async fn list_envelopes(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<Envelope>, DatabaseError> {
        self.envelopes.list_recent(conversation_id, limit).await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    type Error = DatabaseError;

    async fn insert_user(&self, id: UserId, user: &NewUserRecord) -> Result<User, DatabaseError> {
        self.users.create(id, user).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        self.users.find_by_id(id).await
    }

    async fn update_user(
        &self,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<Option<User>, DatabaseError> {
        self.users.update(id, update).await
    }

    async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<User>, DatabaseError> {
        self.users.search(query, limit).await
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    type Error = DatabaseError;

    async fn insert_contact(
        &self,
        id: ContactId,
        contact: &NewContact,
    ) -> Result<Contact, DatabaseError> {
        self.contacts.create(id, contact).await
    }

    async fn find_contact(&self, id: ContactId) -> Result<Option<Contact>, DatabaseError> {
        self.contacts.find_by_id(id).await
    }

    async fn list_contacts(&self, owner: UserId) -> Result<Vec<Contact>, DatabaseError> {
        self.contacts.list_by_owner(owner).await
    }

    async fn search_contacts(
        &self,
        owner: UserId,
        query: &str,
    ) -> Result<Vec<Contact>, DatabaseError> {
        self.contacts.search(owner, query).await
    }

    async fn delete_contact(&self, id: ContactId) -> Result<bool, DatabaseError> {
        self.contacts.delete(id).await
    }
}

//! In-memory stores and deterministic helpers for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::conflict::{Classify, Conflict};
use crate::entities::{
    Contact, ContactId, Conversation, ConversationId, Envelope, EnvelopeId, NewContact,
    NewEnvelope, NewUserRecord, User, UserId, UserUpdate,
};
use crate::ids::IdGenerator;
use crate::store::{ContactStore, ConversationStore, UserStore};

/// Hands out `1, 2, 3, ...` as UUIDs so every attempt is distinct and
/// predictable.
#[derive(Debug, Default)]
pub struct SequenceIds {
    next: AtomicU64,
}

impl SequenceIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::Relaxed)) + 1)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptedError {
    #[error("primary key collision")]
    Collision,
    #[error("unique constraint failed: {0}")]
    Unique(&'static str),
    #[error("referenced row missing")]
    Missing,
    #[error("referenced user missing")]
    MissingUser,
    #[error("storage is broken")]
    Broken,
}

impl Classify for ScriptedError {
    fn classify(&self) -> Conflict {
        match self {
            Self::Collision => Conflict::KeyCollision,
            Self::Unique(constraint) => Conflict::UniqueViolation {
                constraint: (*constraint).to_string(),
            },
            Self::Missing => Conflict::NotFound {
                entity: "conversation",
                id: "unknown".to_string(),
            },
            Self::MissingUser => Conflict::NotFound {
                entity: "user",
                id: "unknown".to_string(),
            },
            Self::Broken => Conflict::Other,
        }
    }
}

pub fn envelope(conversation_id: ConversationId, body: &str) -> Envelope {
    Envelope {
        id: Uuid::new_v4(),
        sender_id: Uuid::new_v4(),
        conversation_id,
        body: body.to_string(),
        created_at: Utc::now(),
    }
}

#[derive(Default)]
struct State {
    conversations: Vec<Conversation>,
    envelopes: Vec<Envelope>,
    users: HashMap<UserId, User>,
    contacts: Vec<Contact>,
    attempted_envelope_ids: Vec<EnvelopeId>,
    scripted: VecDeque<ScriptedError>,
}

/// Store backed by plain collections. Failures can be queued up front and are
/// consumed by the next inserts of any kind.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn seed_conversation(&self, members: &[UserId]) -> ConversationId {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().conversations.push(Conversation {
            id,
            members: members.to_vec(),
            created_at: Utc::now(),
        });
        id
    }

    pub fn seed_user(&self, username: &str, email: &str) -> UserId {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                email: email.to_string(),
                password_hash: "seeded".to_string(),
                created_at: Utc::now(),
                updated_at: None,
            },
        );
        id
    }

    pub fn fail_next_inserts_with_collision(&self, count: usize) {
        self.queue(ScriptedError::Collision, count);
    }

    pub fn fail_next_inserts_with_broken_storage(&self, count: usize) {
        self.queue(ScriptedError::Broken, count);
    }

    pub fn envelope_count(&self) -> usize {
        self.state.lock().unwrap().envelopes.len()
    }

    pub fn envelope_ids_in_commit_order(&self) -> Vec<EnvelopeId> {
        self.state
            .lock()
            .unwrap()
            .envelopes
            .iter()
            .map(|envelope| envelope.id)
            .collect()
    }

    pub fn attempted_envelope_ids(&self) -> Vec<EnvelopeId> {
        self.state.lock().unwrap().attempted_envelope_ids.clone()
    }

    fn queue(&self, error: ScriptedError, count: usize) {
        let mut state = self.state.lock().unwrap();
        state.scripted.extend(std::iter::repeat(error).take(count));
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    type Error = ScriptedError;

    async fn insert_conversation(
        &self,
        id: ConversationId,
        members: &[UserId],
    ) -> Result<Conversation, ScriptedError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.scripted.pop_front() {
            return Err(error);
        }
        if state.conversations.iter().any(|c| c.id == id) {
            return Err(ScriptedError::Collision);
        }
        let conversation = Conversation {
            id,
            members: members.to_vec(),
            created_at: Utc::now(),
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn insert_envelope(
        &self,
        id: EnvelopeId,
        envelope: &NewEnvelope,
    ) -> Result<Envelope, ScriptedError> {
        let mut state = self.state.lock().unwrap();
        state.attempted_envelope_ids.push(id);
        if let Some(error) = state.scripted.pop_front() {
            return Err(error);
        }
        if state.envelopes.iter().any(|e| e.id == id) {
            return Err(ScriptedError::Collision);
        }
        if !state
            .conversations
            .iter()
            .any(|c| c.id == envelope.conversation_id)
        {
            return Err(ScriptedError::Missing);
        }
        let persisted = Envelope {
            id,
            sender_id: envelope.sender_id,
            conversation_id: envelope.conversation_id,
            body: envelope.body.clone(),
            created_at: Utc::now(),
        };
        state.envelopes.push(persisted.clone());
        Ok(persisted)
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, ScriptedError> {
        let state = self.state.lock().unwrap();
        Ok(state.conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn list_conversations(&self, member: UserId) -> Result<Vec<Conversation>, ScriptedError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .conversations
            .iter()
            .rev()
            .filter(|c| c.has_member(&member))
            .cloned()
            .collect())
    }

    async fn list_envelopes(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<Envelope>, ScriptedError> {
        let state = self.state.lock().unwrap();
        let mut latest: Vec<Envelope> = state
            .envelopes
            .iter()
            .rev()
            .filter(|e| e.conversation_id == conversation_id)
            .take(limit as usize)
            .cloned()
            .collect();
        latest.reverse();
        Ok(latest)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    type Error = ScriptedError;

    async fn insert_user(&self, id: UserId, user: &NewUserRecord) -> Result<User, ScriptedError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.scripted.pop_front() {
            return Err(error);
        }
        if state.users.contains_key(&id) {
            return Err(ScriptedError::Collision);
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(ScriptedError::Unique("users.username"));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(ScriptedError::Unique("users.email"));
        }
        let created = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ScriptedError> {
        Ok(self.state.lock().unwrap().users.get(&id).cloned())
    }

    async fn update_user(
        &self,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<Option<User>, ScriptedError> {
        let mut state = self.state.lock().unwrap();
        let others = state.users.values().filter(|u| u.id != id);
        for other in others {
            if other.username == update.username {
                return Err(ScriptedError::Unique("users.username"));
            }
            if other.email == update.email {
                return Err(ScriptedError::Unique("users.email"));
            }
        }
        Ok(state.users.get_mut(&id).map(|user| {
            user.username = update.username.clone();
            user.email = update.email.clone();
            user.updated_at = Some(Utc::now());
            user.clone()
        }))
    }

    async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<User>, ScriptedError> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<User> = state
            .users
            .values()
            .filter(|user| matches_user(user, query))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(limit as usize);
        Ok(found)
    }
}

fn matches_user(user: &User, query: &str) -> bool {
    let query = query.to_uppercase();
    user.username.to_uppercase().contains(&query) || user.email.to_uppercase().contains(&query)
}

#[async_trait]
impl ContactStore for MemoryStore {
    type Error = ScriptedError;

    async fn insert_contact(
        &self,
        id: ContactId,
        contact: &NewContact,
    ) -> Result<Contact, ScriptedError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.scripted.pop_front() {
            return Err(error);
        }
        if state.contacts.iter().any(|c| c.id == id) {
            return Err(ScriptedError::Collision);
        }
        if !state.users.contains_key(&contact.owner_id)
            || !state.users.contains_key(&contact.recipient_id)
        {
            return Err(ScriptedError::MissingUser);
        }
        if state
            .contacts
            .iter()
            .any(|c| c.owner_id == contact.owner_id && c.recipient_id == contact.recipient_id)
        {
            return Err(ScriptedError::Unique("contacts.owner_id, contacts.recipient_id"));
        }
        let created = Contact {
            id,
            owner_id: contact.owner_id,
            recipient_id: contact.recipient_id,
            created_at: Utc::now(),
        };
        state.contacts.push(created.clone());
        Ok(created)
    }

    async fn find_contact(&self, id: ContactId) -> Result<Option<Contact>, ScriptedError> {
        let state = self.state.lock().unwrap();
        Ok(state.contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn list_contacts(&self, owner: UserId) -> Result<Vec<Contact>, ScriptedError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contacts
            .iter()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn search_contacts(
        &self,
        owner: UserId,
        query: &str,
    ) -> Result<Vec<Contact>, ScriptedError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contacts
            .iter()
            .filter(|c| c.owner_id == owner)
            .filter(|c| {
                state
                    .users
                    .get(&c.recipient_id)
                    .is_some_and(|user| matches_user(user, query))
            })
            .cloned()
            .collect())
    }

    async fn delete_contact(&self, id: ContactId) -> Result<bool, ScriptedError> {
        let mut state = self.state.lock().unwrap();
        let before = state.contacts.len();
        state.contacts.retain(|c| c.id != id);
        Ok(state.contacts.len() != before)
    }
}

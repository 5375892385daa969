//! Domain entities for conversations, envelopes, users and contacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ConversationId = Uuid;
pub type EnvelopeId = Uuid;
pub type UserId = Uuid;
pub type ContactId = Uuid;

/// A single persisted chat message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub sender_id: UserId,
    pub conversation_id: ConversationId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// An envelope as submitted by a sender, before the server assigns
/// identifier and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnvelope {
    pub sender_id: UserId,
    pub conversation_id: ConversationId,
    pub body: String,
}

impl NewEnvelope {
    pub fn new(sender_id: UserId, conversation_id: ConversationId, body: impl Into<String>) -> Self {
        Self {
            sender_id,
            conversation_id,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversation {
    pub recipients: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registration request as received from the API layer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Validated registration ready for insertion; the password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// New username and email for an existing user. Both fields are replaced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
}

/// One entry in an owner's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub owner_id: UserId,
    pub recipient_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub owner_id: UserId,
    pub recipient_id: UserId,
}

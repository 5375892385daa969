//! Envelope repository for database operations.

use chrono::Utc;
use courier_messenger::{ConversationId, Envelope, EnvelopeId, NewEnvelope};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::types::rows::{format_timestamp, parse_timestamp, parse_uuid};
use crate::types::{DatabaseError, DatabaseResult};

/// Repository for envelope database operations
#[derive(Clone)]
pub struct EnvelopeRepository {
    pool: SqlitePool,
}

impl EnvelopeRepository {
    /// Create a new envelope repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an envelope under the given identifier.
    ///
    /// A missing conversation is reported as [`DatabaseError::MissingReference`].
    pub async fn create(&self, id: EnvelopeId, envelope: &NewEnvelope) -> DatabaseResult<Envelope> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO envelopes (id, conversation_id, sender_id, body, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(envelope.conversation_id.to_string())
        .bind(envelope.sender_id.to_string())
        .bind(&envelope.body)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await;

        if let Err(error) = result {
            let error = DatabaseError::from(error);
            if error.is_foreign_key_violation() {
                return Err(DatabaseError::MissingReference {
                    entity: "conversation",
                    id: envelope.conversation_id.to_string(),
                });
            }
            return Err(error);
        }

        debug!(envelope_id = %id, conversation_id = %envelope.conversation_id, "inserted envelope row");

        Ok(Envelope {
            id,
            sender_id: envelope.sender_id,
            conversation_id: envelope.conversation_id,
            body: envelope.body.clone(),
            created_at,
        })
    }

    /// The latest `limit` envelopes of a conversation, oldest first
    pub async fn list_recent(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> DatabaseResult<Vec<Envelope>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, body, created_at FROM (
                 SELECT id, conversation_id, sender_id, body, created_at, rowid AS seq
                 FROM envelopes WHERE conversation_id = ?
                 ORDER BY created_at DESC, seq DESC LIMIT ?
             ) ORDER BY created_at ASC, seq ASC",
        )
        .bind(conversation_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(envelope_from_row).collect()
    }
}

fn envelope_from_row(row: &SqliteRow) -> DatabaseResult<Envelope> {
    let id: String = row.try_get("id")?;
    let conversation_id: String = row.try_get("conversation_id")?;
    let sender_id: String = row.try_get("sender_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Envelope {
        id: parse_uuid("envelopes.id", &id)?,
        sender_id: parse_uuid("envelopes.sender_id", &sender_id)?,
        conversation_id: parse_uuid("envelopes.conversation_id", &conversation_id)?,
        body: row.try_get("body")?,
        created_at: parse_timestamp("envelopes.created_at", &created_at)?,
    })
}

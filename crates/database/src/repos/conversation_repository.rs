//! Conversation repository for database operations.

use std::collections::HashMap;

use chrono::Utc;
use courier_messenger::{Conversation, ConversationId, UserId};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::types::rows::{format_timestamp, parse_timestamp, parse_uuid};
use crate::types::DatabaseResult;

/// Repository for conversations and their member lists
#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a conversation and its members in one transaction.
    pub async fn create(
        &self,
        id: ConversationId,
        members: &[UserId],
    ) -> DatabaseResult<Conversation> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO conversations (id, created_at) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(format_timestamp(&created_at))
            .execute(&mut *tx)
            .await?;

        for (position, member) in members.iter().enumerate() {
            sqlx::query(
                "INSERT INTO conversation_members (conversation_id, member_id, position) VALUES (?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(member.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(conversation_id = %id, members = members.len(), "inserted conversation rows");

        Ok(Conversation {
            id,
            members: members.to_vec(),
            created_at,
        })
    }

    /// Find a conversation by ID
    pub async fn find_by_id(&self, id: ConversationId) -> DatabaseResult<Option<Conversation>> {
        let row = sqlx::query("SELECT id, created_at FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: String = row.try_get("created_at")?;
        Ok(Some(Conversation {
            id,
            members: self.members_of(id).await?,
            created_at: parse_timestamp("conversations.created_at", &created_at)?,
        }))
    }

    /// Conversations the member belongs to, newest first
    pub async fn list_by_member(&self, member: UserId) -> DatabaseResult<Vec<Conversation>> {
        let rows = sqlx::query(
            "SELECT c.id AS conversation_id, c.created_at AS created_at, m.member_id AS member_id
             FROM conversations c
             JOIN conversation_members m ON m.conversation_id = c.id
             WHERE c.id IN (SELECT conversation_id FROM conversation_members WHERE member_id = ?)
             ORDER BY c.created_at DESC, c.rowid DESC, m.position ASC",
        )
        .bind(member.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut conversations: Vec<Conversation> = Vec::new();
        let mut index: HashMap<ConversationId, usize> = HashMap::new();

        for row in rows {
            let conversation_id: String = row.try_get("conversation_id")?;
            let conversation_id = parse_uuid("conversations.id", &conversation_id)?;
            let member_id: String = row.try_get("member_id")?;
            let member_id = parse_uuid("conversation_members.member_id", &member_id)?;

            match index.get(&conversation_id) {
                Some(&position) => conversations[position].members.push(member_id),
                None => {
                    let created_at: String = row.try_get("created_at")?;
                    index.insert(conversation_id, conversations.len());
                    conversations.push(Conversation {
                        id: conversation_id,
                        members: vec![member_id],
                        created_at: parse_timestamp("conversations.created_at", &created_at)?,
                    });
                }
            }
        }

        Ok(conversations)
    }

    async fn members_of(&self, id: ConversationId) -> DatabaseResult<Vec<UserId>> {
        let rows = sqlx::query(
            "SELECT member_id FROM conversation_members WHERE conversation_id = ? ORDER BY position ASC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let member_id: String = row.try_get("member_id")?;
                parse_uuid("conversation_members.member_id", &member_id)
            })
            .collect()
    }
}

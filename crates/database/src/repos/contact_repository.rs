//! Contact repository for database operations.

use chrono::Utc;
use courier_messenger::{Contact, ContactId, NewContact, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::user_repository::like_pattern;
use crate::types::rows::{format_timestamp, parse_timestamp, parse_uuid};
use crate::types::{DatabaseError, DatabaseResult};

/// Repository for each user's contact list
#[derive(Clone)]
pub struct ContactRepository {
    pool: SqlitePool,
}

impl ContactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a contact under the given identifier.
    ///
    /// An unknown owner or recipient is reported as
    /// [`DatabaseError::MissingReference`].
    pub async fn create(&self, id: ContactId, contact: &NewContact) -> DatabaseResult<Contact> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO contacts (id, owner_id, recipient_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(contact.owner_id.to_string())
        .bind(contact.recipient_id.to_string())
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await;

        if let Err(error) = result {
            let error = DatabaseError::from(error);
            if error.is_foreign_key_violation() {
                return Err(DatabaseError::MissingReference {
                    entity: "user",
                    id: format!("{} or {}", contact.owner_id, contact.recipient_id),
                });
            }
            return Err(error);
        }

        debug!(contact_id = %id, owner_id = %contact.owner_id, "inserted contact row");

        Ok(Contact {
            id,
            owner_id: contact.owner_id,
            recipient_id: contact.recipient_id,
            created_at,
        })
    }

    pub async fn find_by_id(&self, id: ContactId) -> DatabaseResult<Option<Contact>> {
        let row = sqlx::query(
            "SELECT id, owner_id, recipient_id, created_at FROM contacts WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(contact_from_row).transpose()
    }

    /// Contacts of `owner`, oldest first
    pub async fn list_by_owner(&self, owner: UserId) -> DatabaseResult<Vec<Contact>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, recipient_id, created_at FROM contacts
             WHERE owner_id = ?
             ORDER BY created_at, rowid",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(contact_from_row).collect()
    }

    /// Contacts of `owner` whose recipient's username or email contains
    /// `query`, ignoring case.
    pub async fn search(&self, owner: UserId, query: &str) -> DatabaseResult<Vec<Contact>> {
        let pattern = like_pattern(query);

        let rows = sqlx::query(
            "SELECT c.id, c.owner_id, c.recipient_id, c.created_at FROM contacts c
             JOIN users u ON u.id = c.recipient_id
             WHERE c.owner_id = ?
               AND (UPPER(u.username) LIKE ? ESCAPE '\\' OR UPPER(u.email) LIKE ? ESCAPE '\\')
             ORDER BY c.created_at, c.rowid",
        )
        .bind(owner.to_string())
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(contact_from_row).collect()
    }

    /// Hard delete. Returns whether the contact existed.
    pub async fn delete(&self, id: ContactId) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn contact_from_row(row: &SqliteRow) -> DatabaseResult<Contact> {
    let id: String = row.try_get("id")?;
    let owner_id: String = row.try_get("owner_id")?;
    let recipient_id: String = row.try_get("recipient_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Contact {
        id: parse_uuid("contacts.id", &id)?,
        owner_id: parse_uuid("contacts.owner_id", &owner_id)?,
        recipient_id: parse_uuid("contacts.recipient_id", &recipient_id)?,
        created_at: parse_timestamp("contacts.created_at", &created_at)?,
    })
}

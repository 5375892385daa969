//! User repository for database operations.

use chrono::Utc;
use courier_messenger::{NewUserRecord, User, UserId, UserUpdate};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::types::rows::{format_timestamp, parse_timestamp, parse_uuid};
use crate::types::DatabaseResult;

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user under the given identifier.
    pub async fn create(&self, id: UserId, record: &NewUserRecord) -> DatabaseResult<User> {
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, NULL)",
        )
        .bind(id.to_string())
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        debug!(user_id = %id, "inserted user row");

        Ok(User {
            id,
            username: record.username.clone(),
            email: record.email.clone(),
            password_hash: record.password_hash.clone(),
            created_at,
            updated_at: None,
        })
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: UserId) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

impl UserRepository {
    /// Replace username and email and stamp `updated_at`.
    pub async fn update(&self, id: UserId, update: &UserUpdate) -> DatabaseResult<Option<User>> {
        let updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&update.username)
        .bind(&update.email)
        .bind(format_timestamp(&updated_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!(user_id = %id, "updated user row");
        self.find_by_id(id).await
    }

    /// Case-insensitive substring match on username or email.
    pub async fn search(&self, query: &str, limit: u32) -> DatabaseResult<Vec<User>> {
        let pattern = like_pattern(query);

        let rows = sqlx::query(
            "SELECT id, username, email, password_hash, created_at, updated_at FROM users
             WHERE UPPER(username) LIKE ? ESCAPE '\\' OR UPPER(email) LIKE ? ESCAPE '\\'
             ORDER BY username
             LIMIT ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}

/// `%TERM%` with LIKE wildcards in the term escaped, upper-cased to match
/// `UPPER(column)`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_ascii_uppercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn user_from_row(row: &SqliteRow) -> DatabaseResult<User> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;

    Ok(User {
        id: parse_uuid("users.id", &id)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: parse_timestamp("users.created_at", &created_at)?,
        updated_at: updated_at
            .map(|value| parse_timestamp("users.updated_at", &value))
            .transpose()?,
    })
}

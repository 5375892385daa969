//! Error types for the database layer

use courier_messenger::{Classify, Conflict};
use thiserror::Error;

/// SQLite extended result codes the conflict layer cares about.
pub(crate) const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
pub(crate) const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
pub(crate) const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    ConnectionError(String),

    #[error("database migration error: {0}")]
    MigrationError(String),

    #[error("database query error: {0}")]
    QueryError(#[from] sqlx::Error),

    /// Insert referenced a row that does not exist.
    #[error("{entity} not found: {id}")]
    MissingReference { entity: &'static str, id: String },

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt column {column}: {message}")]
    CorruptColumn { column: &'static str, message: String },
}

impl DatabaseError {
    /// Extended SQLite result code of a failed statement, if any.
    pub fn sqlite_code(&self) -> Option<String> {
        match self {
            Self::QueryError(sqlx::Error::Database(error)) => {
                error.code().map(|code| code.into_owned())
            }
            _ => None,
        }
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlite_code().as_deref() == Some(SQLITE_CONSTRAINT_FOREIGNKEY)
    }
}

impl Classify for DatabaseError {
    fn classify(&self) -> Conflict {
        if let Self::MissingReference { entity, id } = self {
            return Conflict::NotFound {
                entity: *entity,
                id: id.clone(),
            };
        }

        match self.sqlite_code().as_deref() {
            Some(SQLITE_CONSTRAINT_PRIMARYKEY) => Conflict::KeyCollision,
            Some(SQLITE_CONSTRAINT_UNIQUE) => Conflict::UniqueViolation {
                constraint: self.constraint_name(),
            },
            Some(SQLITE_CONSTRAINT_FOREIGNKEY) => Conflict::NotFound {
                entity: "referenced record",
                id: "unknown".to_string(),
            },
            _ => Conflict::Other,
        }
    }
}

impl DatabaseError {
    /// Failing column as reported by SQLite, e.g. `users.email`. Display only.
    fn constraint_name(&self) -> String {
        let Self::QueryError(sqlx::Error::Database(error)) = self else {
            return "unknown".to_string();
        };

        error
            .message()
            .rsplit_once(": ")
            .map(|(_, columns)| columns.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

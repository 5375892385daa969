//! Courier Database Crate
//!
//! SQLite connection management, embedded migrations, repositories, and the
//! [`SqliteStore`] that backs the messenger core.

use courier_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod migrations;
pub mod repos;
pub mod store;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;
pub use repos::{ContactRepository, ConversationRepository, EnvelopeRepository, UserRepository};
pub use store::SqliteStore;
pub use types::{DatabaseError, DatabaseResult};

/// Open the pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

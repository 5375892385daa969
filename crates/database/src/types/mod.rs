//! Shared types and result types for the database layer

pub mod errors;
pub mod rows;

pub use errors::DatabaseError;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

//! Conflict resolution for inserts keyed by generated identifiers.
//!
//! Storage backends report failures through [`Classify`]. A primary-key
//! collision is recovered here by drawing a fresh identifier; every other
//! outcome is terminal and mapped onto [`MessengerError`].

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{MessengerError, MessengerResult};
use crate::ids::IdGenerator;

/// Storage-agnostic category of a failed insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// The generated primary key already exists.
    KeyCollision,
    /// A business-level uniqueness constraint (username, email) was violated.
    UniqueViolation { constraint: String },
    /// A referenced row does not exist.
    NotFound { entity: &'static str, id: String },
    Other,
}

/// Implemented by storage errors so the retry loop can tell collisions
/// apart from real failures.
pub trait Classify: Display {
    fn classify(&self) -> Conflict;
}

/// Run `insert` with identifiers drawn from `ids` until it succeeds, fails
/// for a reason other than a key collision, or `max_attempts` is exhausted.
///
/// Each attempt uses a freshly generated identifier. A unique violation is
/// never retried.
pub async fn insert_with_retry<T, E, F, Fut>(
    ids: &dyn IdGenerator,
    max_attempts: u32,
    mut insert: F,
) -> MessengerResult<T>
where
    E: Classify,
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let id = ids.next_id();

        let error = match insert(id).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if error.classify() != Conflict::KeyCollision {
            return Err(storage_failure(error));
        }
        let collision = MessengerError::TransientCollision { attempt };
        debug!(%id, error = %collision, "drawing a new identifier");
    }

    warn!(max_attempts, "identifier collisions exhausted all insert attempts");
    Err(MessengerError::fatal(format!(
        "identifier space exhausted after {max_attempts} attempts"
    )))
}

/// Map a storage error that will not be retried onto the domain taxonomy.
pub fn storage_failure<E: Classify>(error: E) -> MessengerError {
    match error.classify() {
        Conflict::UniqueViolation { constraint } => MessengerError::already_exists(constraint),
        Conflict::NotFound { entity, id } => MessengerError::NotFound { entity, id },
        Conflict::KeyCollision | Conflict::Other => {
            error!(error = %error, "storage operation failed");
            MessengerError::fatal(error.to_string())
        }
    }
}

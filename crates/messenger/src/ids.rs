//! Identifier generation.
//!
//! Identifiers are random UUIDs. Uniqueness is enforced by the storage layer's
//! primary keys, not by the generator; the conflict layer redraws on collision.

use uuid::Uuid;

/// Source of candidate identifiers for new records.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Production generator drawing version 4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

impl<T: IdGenerator + ?Sized> IdGenerator for std::sync::Arc<T> {
    fn next_id(&self) -> Uuid {
        (**self).next_id()
    }
}

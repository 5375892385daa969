//! Database repository implementations

pub mod contact_repository;
pub mod conversation_repository;
pub mod envelope_repository;
pub mod user_repository;

pub use contact_repository::ContactRepository;
pub use conversation_repository::ConversationRepository;
pub use envelope_repository::EnvelopeRepository;
pub use user_repository::UserRepository;

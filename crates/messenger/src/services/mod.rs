//! Business logic for users, conversations and contacts.

pub mod contact_service;
pub mod conversation_service;
pub mod user_service;

pub use contact_service::ContactService;
pub use conversation_service::ConversationService;
pub use user_service::UserService;

//! Real-time delivery core: identifier generation, conflict resolution,
//! subscription registry, delivery pipeline and stream sessions, plus the
//! user, conversation and contact services built on the same conflict layer.

pub mod conflict;
pub mod entities;
pub mod error;
pub mod ids;
pub mod pipeline;
pub mod registry;
pub mod services;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use conflict::{insert_with_retry, storage_failure, Classify, Conflict};
pub use entities::{
    Contact, ContactId, Conversation, ConversationId, Envelope, EnvelopeId, NewContact,
    NewConversation, NewEnvelope, NewUser, NewUserRecord, User, UserId, UserUpdate,
};
pub use error::{MessengerError, MessengerResult};
pub use ids::{IdGenerator, RandomIds};
pub use pipeline::{DeliveryPipeline, PipelineSettings};
pub use registry::{
    BroadcastReport, Subscriber, SubscriptionHandle, SubscriptionId, SubscriptionRegistry,
};
pub use services::{ContactService, ConversationService, UserService};
pub use session::{EnvelopeSink, SessionEnd, SessionState, StreamSession};
pub use store::{ContactStore, ConversationStore, UserStore};

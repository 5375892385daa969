//! REST API endpoints for the gateway

pub mod contacts;
pub mod conversations;
pub mod envelopes;
pub mod health;
pub mod users;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(users::create_user_routes())
        .merge(contacts::create_contact_routes())
        .merge(conversations::create_conversation_routes())
        .merge(envelopes::create_envelope_routes())
}

pub use contacts::ContactResponse;
pub use conversations::ConversationResponse;
pub use envelopes::EnvelopeResponse;
pub use users::{UserResponse, UserSummary};

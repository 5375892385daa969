//! Conversation REST endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use courier_messenger::{Conversation, NewConversation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: String,
}

impl From<Conversation> for ConversationResponse {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            members: conversation.members,
            created_at: conversation.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub recipients: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    pub member: Uuid,
}

/// Create conversation routes
pub fn create_conversation_routes() -> Router<Arc<GatewayState>> {
    Router::new().route(
        "/api/v1/conversations",
        post(create_conversation).get(list_conversations),
    )
}

/// Create a conversation between two or more users
pub async fn create_conversation(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<ConversationResponse>)> {
    let Json(request) = payload?;

    let conversation = state
        .conversations
        .create_conversation(NewConversation {
            recipients: request.recipients,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(conversation.into())))
}

/// List the conversations a user belongs to
pub async fn list_conversations(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<ListConversationsQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<ConversationResponse>>> {
    let Query(query) = query?;

    let conversations = state.conversations.list_conversations(query.member).await?;
    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

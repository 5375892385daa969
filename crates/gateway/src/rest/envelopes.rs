//! Envelope REST endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use courier_messenger::{Envelope, NewEnvelope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::state::GatewayState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: String,
}

impl From<&Envelope> for EnvelopeResponse {
    fn from(envelope: &Envelope) -> Self {
        Self {
            id: envelope.id,
            conversation_id: envelope.conversation_id,
            sender_id: envelope.sender_id,
            body: envelope.body.clone(),
            created_at: envelope.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendEnvelopeRequest {
    pub sender: Uuid,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListEnvelopesQuery {
    pub limit: Option<u32>,
}

/// Create envelope routes
pub fn create_envelope_routes() -> Router<Arc<GatewayState>> {
    Router::new().route(
        "/api/v1/conversations/:conversation_id/envelopes",
        get(list_envelopes).post(send_envelope),
    )
}

/// Persist an envelope and deliver it to live subscribers
pub async fn send_envelope(
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SendEnvelopeRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<EnvelopeResponse>)> {
    let Path(conversation_id) = path?;
    let Json(request) = payload?;

    let envelope = state
        .pipeline
        .submit(NewEnvelope::new(request.sender, conversation_id, request.body))
        .await?;

    Ok((StatusCode::CREATED, Json(EnvelopeResponse::from(&envelope))))
}

/// Recent envelopes of a conversation, oldest first
pub async fn list_envelopes(
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ListEnvelopesQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<EnvelopeResponse>>> {
    let Path(conversation_id) = path?;
    let Query(query) = query?;

    let envelopes = state.pipeline.history(conversation_id, query.limit).await?;
    Ok(Json(envelopes.iter().map(EnvelopeResponse::from).collect()))
}

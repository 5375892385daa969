//! Contact REST endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use courier_messenger::{Contact, NewContact};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recipient_id: Uuid,
    pub created_at: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            owner_id: contact.owner_id,
            recipient_id: contact.recipient_id,
            created_at: contact.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub owner_id: Uuid,
    pub recipient_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    pub owner: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SearchContactsQuery {
    pub owner: Uuid,
    pub q: String,
}

/// Create contact routes
pub fn create_contact_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/v1/contacts", post(create_contact).get(list_contacts))
        .route("/api/v1/contacts/search", get(search_contacts))
        .route(
            "/api/v1/contacts/:contact_id",
            get(get_contact).delete(delete_contact),
        )
}

/// Add a user to the owner's contacts
pub async fn create_contact(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<CreateContactRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<ContactResponse>)> {
    let Json(request) = payload?;

    let contact = state
        .contacts
        .add_contact(NewContact {
            owner_id: request.owner_id,
            recipient_id: request.recipient_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(contact.into())))
}

pub async fn list_contacts(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<ListContactsQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<ContactResponse>>> {
    let Query(query) = query?;

    let contacts = state.contacts.list_contacts(query.owner).await?;
    Ok(Json(contacts.into_iter().map(Into::into).collect()))
}

/// Search the owner's contacts by recipient username or email
pub async fn search_contacts(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<SearchContactsQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<ContactResponse>>> {
    let Query(query) = query?;

    let contacts = state.contacts.search_contacts(query.owner, &query.q).await?;
    Ok(Json(contacts.into_iter().map(Into::into).collect()))
}

pub async fn get_contact(
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> GatewayResult<Json<ContactResponse>> {
    let Path(contact_id) = path?;
    let contact = state.contacts.get_contact(contact_id).await?;
    Ok(Json(contact.into()))
}

pub async fn delete_contact(
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> GatewayResult<StatusCode> {
    let Path(contact_id) = path?;
    state.contacts.remove_contact(contact_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

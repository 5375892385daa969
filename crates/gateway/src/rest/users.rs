//! User REST endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use courier_messenger::{NewUser, User, UserUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Search hit: enough to add the user as a contact, without the email.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchUsersQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Create user routes
pub fn create_user_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/search", get(search_users))
        .route("/api/v1/users/:user_id", get(get_user).put(update_user))
}

/// Register a user
pub async fn create_user(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<UserResponse>)> {
    let Json(request) = payload?;

    let user = state
        .users
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> GatewayResult<Json<UserResponse>> {
    let Path(user_id) = path?;
    let user = state.users.get_user(user_id).await?;
    Ok(Json(user.into()))
}

/// Replace a user's username and email
pub async fn update_user(
    State(state): State<Arc<GatewayState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> GatewayResult<Json<UserResponse>> {
    let Path(user_id) = path?;
    let Json(request) = payload?;

    let user = state
        .users
        .update_user(
            user_id,
            UserUpdate {
                username: request.username,
                email: request.email,
            },
        )
        .await?;
    Ok(Json(user.into()))
}

/// Find users by username or email fragment
pub async fn search_users(
    State(state): State<Arc<GatewayState>>,
    query: Result<Query<SearchUsersQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<UserSummary>>> {
    let Query(query) = query?;

    let users = state.users.search_users(&query.q).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

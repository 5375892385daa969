//! Shared fixtures for the gateway integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use courier_config::{DatabaseConfig, DeliveryConfig};
use courier_database::{initialize_database, SqliteStore};
use courier_gateway::{create_router, GatewayState};
use courier_messenger::{NewConversation, NewUser, SubscriptionRegistry};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

pub type TestResult<T = ()> = anyhow::Result<T>;

pub struct TestContext {
    _temp_dir: TempDir,
    pub state: GatewayState,
    pub registry: Arc<SubscriptionRegistry>,
    pub shutdown: CancellationToken,
}

impl TestContext {
    pub async fn new() -> TestResult<Self> {
        Self::with_delivery(DeliveryConfig::default()).await
    }

    pub async fn with_delivery(delivery: DeliveryConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("gateway.sqlite");
        let database = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 4,
        };

        let pool = initialize_database(&database).await?;
        let registry = Arc::new(SubscriptionRegistry::new(delivery.overflow_policy));
        let shutdown = CancellationToken::new();
        let state = GatewayState::new(
            Arc::new(SqliteStore::new(pool)),
            registry.clone(),
            &delivery,
            shutdown.clone(),
        );

        Ok(Self {
            _temp_dir: temp_dir,
            state,
            registry,
            shutdown,
        })
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub async fn conversation(&self, members: &[Uuid]) -> TestResult<Uuid> {
        let conversation = self
            .state
            .conversations
            .create_conversation(NewConversation {
                recipients: members.to_vec(),
            })
            .await?;
        Ok(conversation.id)
    }

    pub async fn user(&self, username: &str, email: &str) -> TestResult<Uuid> {
        let user = self
            .state
            .users
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password: "long enough secret".to_string(),
            })
            .await?;
        Ok(user.id)
    }

    /// Serve the router on an ephemeral port until the test ends.
    pub async fn spawn_server(&self) -> TestResult<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(addr)
    }
}

/// Issue one request against a fresh router and decode the JSON body.
pub async fn request(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> TestResult<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json)?)
        }
        None => Body::empty(),
    };

    let response = router.oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

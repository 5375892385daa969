//! Shared application state for the gateway

use std::sync::Arc;

use courier_config::DeliveryConfig;
use courier_database::SqliteStore;
use courier_messenger::{
    ContactService, ConversationService, DeliveryPipeline, IdGenerator, PipelineSettings, RandomIds,
    SubscriptionRegistry, UserService,
};
use tokio_util::sync::CancellationToken;

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    /// Persist-then-broadcast pipeline for envelopes
    pub pipeline: Arc<DeliveryPipeline<SqliteStore>>,
    /// Live stream subscribers per conversation
    pub registry: Arc<SubscriptionRegistry>,
    pub users: Arc<UserService<SqliteStore>>,
    pub conversations: Arc<ConversationService<SqliteStore>>,
    pub contacts: Arc<ContactService<SqliteStore>>,
    /// Parent of every stream session token; cancelled on shutdown
    pub shutdown: CancellationToken,
    /// Queue depth per stream subscriber
    pub subscriber_buffer: usize,
}

impl GatewayState {
    /// Wire the services around an existing store and registry.
    pub fn new(
        store: Arc<SqliteStore>,
        registry: Arc<SubscriptionRegistry>,
        delivery: &DeliveryConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let ids: Arc<dyn IdGenerator> = Arc::new(RandomIds);

        let pipeline = Arc::new(DeliveryPipeline::new(
            store.clone(),
            registry.clone(),
            ids.clone(),
            PipelineSettings::from(delivery),
        ));
        let users = Arc::new(UserService::new(
            store.clone(),
            ids.clone(),
            delivery.max_insert_attempts,
        ));
        let conversations = Arc::new(ConversationService::new(
            store.clone(),
            ids.clone(),
            delivery.max_insert_attempts,
        ));
        let contacts = Arc::new(ContactService::new(
            store,
            ids,
            delivery.max_insert_attempts,
        ));

        Self {
            pipeline,
            registry,
            users,
            conversations,
            contacts,
            shutdown,
            subscriber_buffer: delivery.subscriber_buffer,
        }
    }
}

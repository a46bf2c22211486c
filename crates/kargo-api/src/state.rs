//! Application state shared across request handlers and workers

use crate::config::AppConfig;
use crate::services::ingestion::IngestionService;
use crate::workers::dispatcher::GroupDispatcher;
use kargo_core::auth::{RevocationStore, TokenConfig, TokenService};
use kargo_core::errors::CoreResult;
use kargo_core::parser::ParserConfig;
use kargo_core::transitions::FeePolicy;
use kargo_db::{DbConfig, StorageAdapter};
use kargo_whatsapp::{BridgeClient, BridgeConfig};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<StorageAdapter>,
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub revocations: Arc<RevocationStore>,
    pub bridge: Option<Arc<BridgeClient>>,
    pub dispatcher: Arc<GroupDispatcher>,
    pub fee_policy: FeePolicy,
}

impl AppState {
    /// Connect the storage backend and wire the ingestion side together.
    pub async fn new(config: AppConfig, db_config: DbConfig) -> CoreResult<Self> {
        let adapter = Arc::new(StorageAdapter::connect(&db_config).await?);
        kargo_db::schema::create_schema(&adapter).await?;
        kargo_db::schema::ensure_seed(
            &adapter,
            config.admin.email.as_deref(),
            config.admin.password.as_deref(),
        )
        .await?;

        let tokens = TokenService::new(TokenConfig::new(
            config.auth.jwt_secret.clone(),
            config.auth.jwt_expires_in,
        ));

        let bridge = match &config.bridge {
            Some(settings) => match BridgeClient::new(BridgeConfig {
                base_url: settings.url.clone(),
                token: settings.token.clone(),
            }) {
                Ok(client) => Some(Arc::new(client)),
                Err(error) => {
                    warn!(%error, "bridge client unavailable, outbound sends disabled");
                    None
                }
            },
            None => None,
        };

        let fee_policy = FeePolicy::default();
        let ingestion = Arc::new(IngestionService::new(
            adapter.clone(),
            ParserConfig::default(),
            fee_policy,
            config.ingestion.clone(),
            bridge.clone(),
        ));
        let dispatcher = Arc::new(GroupDispatcher::new(ingestion));

        info!("application state initialized");
        Ok(Self {
            adapter,
            config: Arc::new(config),
            tokens,
            revocations: Arc::new(RevocationStore::new()),
            bridge,
            dispatcher,
            fee_policy,
        })
    }
}

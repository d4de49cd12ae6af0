// Client-side session and navigation layer for the matchmaking frontend.

pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use models::errors::AppError;
use services::api_client::ApiClient;
use services::kv_store::ExpiringStore;
use services::recommendations::RecommendationStore;
use services::router::Router;
use services::session_store::SessionStore;
use utils::config::AppConfig;

/// Explicitly-owned application context: one instance per tab/process,
/// handed to whatever needs session data. No ambient singletons.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<ExpiringStore>,
    pub router: Arc<Router>,
    pub session: Arc<SessionStore>,
    pub recommendations: Arc<RecommendationStore>,
}

impl AppContext {
    /// Wires up storage, router, and stores, restoring any persisted session
    /// that is still within its TTL.
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        let storage = Arc::new(ExpiringStore::with_ttl(
            &config.storage_dir,
            Duration::from_secs(config.session_ttl_seconds),
        )?);

        let restored = SessionStore::restore(&storage).await?;
        let state = Arc::new(RwLock::new(restored));

        let router = Arc::new(Router::new(state.clone()));
        let api = ApiClient::new(config.api_base_url.clone());
        let session = Arc::new(SessionStore::new(
            state,
            storage.clone(),
            api.clone(),
            router.clone(),
        ));

        let recommendations = Arc::new(RecommendationStore::new(storage.clone(), api));
        recommendations.restore().await?;

        tracing::debug!("Application context initialized");
        Ok(Self {
            config: Arc::new(config),
            storage,
            router,
            session,
            recommendations,
        })
    }
}

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::models::errors::AppError;
use crate::services::api_client::ApiClient;
use crate::services::kv_store::ExpiringStore;

const STORAGE_KEY: &str = "recommendations";

/// Holds the raw recommendation list for the current user. Persists
/// legacy-style: bare JSON under its own container, no TTL envelope.
pub struct RecommendationStore {
    recommendations: RwLock<Vec<Value>>,
    storage: Arc<ExpiringStore>,
    api: ApiClient,
}

impl RecommendationStore {
    pub fn new(storage: Arc<ExpiringStore>, api: ApiClient) -> Self {
        Self {
            recommendations: RwLock::new(Vec::new()),
            storage,
            api,
        }
    }

    /// Reloads the persisted list, if any. Content that isn't the expected
    /// shape is ignored.
    pub async fn restore(&self) -> Result<(), AppError> {
        if let Some(value) = self.storage.get(STORAGE_KEY).await? {
            if let Some(list) = value.get("recommendations").and_then(Value::as_array) {
                *self.recommendations.write().await = list.clone();
            } else {
                tracing::warn!("Ignoring malformed persisted recommendations");
            }
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<Value> {
        self.recommendations.read().await.clone()
    }

    pub async fn reset(&self) -> Result<(), AppError> {
        self.recommendations.write().await.clear();
        self.persist().await
    }

    /// Fetches recommendations for a user. Remote failures are logged and
    /// degrade to an empty list; only storage failures propagate.
    pub async fn fetch(&self, user_id: &str) -> Result<Vec<Value>, AppError> {
        let list = match self.api.recommendations(user_id).await {
            Ok(Value::Array(list)) => list,
            Ok(other) => {
                tracing::error!("Unexpected recommendations payload: {}", other);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Error fetching recommendations: {}", e);
                Vec::new()
            }
        };

        *self.recommendations.write().await = list.clone();
        self.persist().await?;
        Ok(list)
    }

    async fn persist(&self) -> Result<(), AppError> {
        let list = self.recommendations.read().await.clone();
        self.storage
            .set_raw(STORAGE_KEY, &json!({ "recommendations": list }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> RecommendationStore {
        let storage = Arc::new(ExpiringStore::new(dir.path()).unwrap());
        RecommendationStore::new(storage, ApiClient::new("http://127.0.0.1:9"))
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty_list() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        // Nothing listens on the configured port.
        let list = store.fetch("u1").await.unwrap();
        assert!(list.is_empty());
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_persists_empty_state_raw() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.reset().await.unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("recommendations.json")).unwrap();
        assert_eq!(on_disk, r#"{"recommendations":[]}"#);
    }

    #[tokio::test]
    async fn test_restore_reads_legacy_persisted_list() {
        let dir = TempDir::new().unwrap();

        std::fs::write(
            dir.path().join("recommendations.json"),
            json!({"recommendations": [{"userId": "u9"}]}).to_string(),
        )
        .unwrap();

        let store = test_store(&dir);
        store.restore().await.unwrap();

        assert_eq!(store.list().await, vec![json!({"userId": "u9"})]);
    }
}

//! In-memory ItemStore implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use cadenza_core::store::{ItemStore, StoreError};

struct ItemEntry {
    value: Value,
    expires_at: Option<Instant>,
}

/// In-memory implementation for development and testing.
#[derive(Default)]
pub struct InMemoryItemStore {
    sessions: RwLock<HashMap<String, HashMap<String, ItemEntry>>>,
}

impl InMemoryItemStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn save_item(
        &self,
        session_id: &str,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        if matches!(ttl, Some(ttl) if ttl.is_zero()) {
            return Err(StoreError::InvalidArgument(
                "ttl must be positive".to_string(),
            ));
        }
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        sessions.entry(session_id.to_string()).or_default().insert(
            key.to_string(),
            ItemEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn load_item(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let Some(items) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        let Some(entry) = items.get(key) else {
            return Ok(None);
        };
        if matches!(entry.expires_at, Some(at) if at <= Instant::now()) {
            items.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load_item() {
        let store = InMemoryItemStore::new();
        store
            .save_item("s1", "stage:1-1:output", json!({"x": 1}), None)
            .await
            .expect("save");

        let value = store
            .load_item("s1", "stage:1-1:output")
            .await
            .expect("load");
        assert_eq!(value, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_missing_key_reads_back_absent() {
        let store = InMemoryItemStore::new();
        assert_eq!(store.load_item("s1", "nope").await.expect("load"), None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryItemStore::new();
        store
            .save_item("s1", "k", json!("v"), None)
            .await
            .expect("save");
        assert_eq!(store.load_item("s2", "k").await.expect("load"), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let store = InMemoryItemStore::new();
        assert!(matches!(
            store
                .save_item("s1", "k", json!("v"), Some(Duration::ZERO))
                .await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_item_reads_back_absent() {
        let store = InMemoryItemStore::new();
        store
            .save_item("s1", "k", json!("v"), Some(Duration::from_millis(10)))
            .await
            .expect("save");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.load_item("s1", "k").await.expect("load"), None);
    }

    #[tokio::test]
    async fn test_last_writer_wins_on_overwrite() {
        let store = InMemoryItemStore::new();
        store
            .save_item("s1", "k", json!(1), None)
            .await
            .expect("save");
        store
            .save_item("s1", "k", json!(2), None)
            .await
            .expect("save");
        assert_eq!(store.load_item("s1", "k").await.expect("load"), Some(json!(2)));
    }
}

//! In-memory TurnStore implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use cadenza_core::store::{ConversationTurn, StoreError, TurnStore};

/// Turn store configuration.
#[derive(Debug, Clone)]
pub struct TurnStoreOptions {
    /// Prefix prepended to the session id to form the storage key.
    pub key_prefix: String,
    /// TTL applied when a save supplies none.
    pub default_ttl: Duration,
    /// Window applied when a load supplies none.
    pub default_max_turns: usize,
}

impl TurnStoreOptions {
    fn validate(&self) -> Result<(), StoreError> {
        if self.key_prefix.is_empty() {
            return Err(StoreError::InvalidArgument(
                "key_prefix must not be empty".to_string(),
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(StoreError::InvalidArgument(
                "default_ttl must be positive".to_string(),
            ));
        }
        if self.default_max_turns == 0 {
            return Err(StoreError::InvalidArgument(
                "default_max_turns must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TurnStoreOptions {
    fn default() -> Self {
        Self {
            key_prefix: "turns:".to_string(),
            default_ttl: Duration::from_secs(3600),
            default_max_turns: 50,
        }
    }
}

struct TurnList {
    turns: Vec<ConversationTurn>,
    expires_at: Instant,
}

/// In-memory implementation for development and testing.
///
/// Every operation takes the entry lock once, so the prepend+expire pair is
/// atomic with respect to the key.
pub struct InMemoryTurnStore {
    options: TurnStoreOptions,
    entries: RwLock<HashMap<String, TurnList>>,
}

impl InMemoryTurnStore {
    /// Create a store with the given options
    pub fn new(options: TurnStoreOptions) -> Result<Self, StoreError> {
        options.validate()?;
        Ok(Self {
            options,
            entries: RwLock::new(HashMap::new()),
        })
    }

    fn storage_key(&self, session_id: &str) -> String {
        format!("{}{}", self.options.key_prefix, session_id)
    }
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn save_turn(
        &self,
        session_id: &str,
        turn: ConversationTurn,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        if matches!(ttl, Some(ttl) if ttl.is_zero()) {
            return Err(StoreError::InvalidArgument(
                "ttl must be positive".to_string(),
            ));
        }
        let ttl = ttl.unwrap_or(self.options.default_ttl);
        let key = self.storage_key(session_id);

        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let now = Instant::now();
        let list = entries.entry(key).or_insert_with(|| TurnList {
            turns: Vec::new(),
            expires_at: now + ttl,
        });
        if list.expires_at <= now {
            list.turns.clear();
        }
        list.turns.insert(0, turn);
        list.expires_at = now + ttl;
        Ok(())
    }

    async fn load_turns(
        &self,
        session_id: &str,
        max_turns: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        if max_turns == Some(0) {
            return Err(StoreError::InvalidArgument(
                "max_turns must be positive".to_string(),
            ));
        }
        let window = max_turns.unwrap_or(self.options.default_max_turns);
        let key = self.storage_key(session_id);

        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let now = Instant::now();
        let Some(list) = entries.get_mut(&key) else {
            return Ok(Vec::new());
        };
        if list.expires_at <= now {
            entries.remove(&key);
            return Ok(Vec::new());
        }
        // Sliding window: trim storage beyond the requested window.
        if list.turns.len() > window {
            list.turns.truncate(window);
        }
        Ok(list.turns.clone())
    }
}

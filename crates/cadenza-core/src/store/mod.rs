//! Context store abstractions
//!
//! Two distinct façades over per-session keyed storage:
//! - TurnStore: bounded conversation history per session (async trait)
//! - ItemStore: general-purpose session KV used by the pipeline (async trait)
//!
//! Note: Implementations are in the cadenza-stores crate

pub mod keys;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::TurnRole;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A single stored conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a new turn stamped with the current time
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Set the turn name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Bounded conversation history per session.
///
/// The newest turn sits at index 0. Saving prepends and resets the key's
/// TTL; the prepend+expire pair is atomic with respect to the key.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Prepend a turn to the session's history and reset its TTL.
    ///
    /// `ttl` falls back to the store's default when absent; a zero TTL
    /// fails with `InvalidArgument`.
    async fn save_turn(
        &self,
        session_id: &str,
        turn: ConversationTurn,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Read the newest `max_turns` entries, newest first.
    ///
    /// A stored list longer than the window is trimmed as a side effect.
    /// Missing or expired sessions return empty. `max_turns` of zero fails
    /// with `InvalidArgument`; absent falls back to the store's default.
    async fn load_turns(
        &self,
        session_id: &str,
        max_turns: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StoreError>;
}

/// General-purpose session KV used by the pipeline.
///
/// Values are JSON-encoded. Missing keys read back as absent, never as an
/// error. All methods are safe under concurrent calls on a shared store.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Save a value under `(session_id, key)`, optionally with a TTL.
    ///
    /// A zero TTL fails with `InvalidArgument`.
    async fn save_item(
        &self,
        session_id: &str,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Load the value under `(session_id, key)`, absent when missing or expired.
    async fn load_item(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError>;
}

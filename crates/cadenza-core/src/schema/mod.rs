//! Schema registry: name → JSON-schema table consulted by the builder.
//!
//! Types are pre-registered at start-up; resolution is a pure lookup. A
//! custom [`SchemaProvider`] can be plugged in where runtime extensibility
//! is needed.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

/// Schema registration errors
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("type name must not be empty")]
    EmptyName,

    #[error("schema for '{type_name}' is not valid JSON: {message}")]
    InvalidSchema { type_name: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Resolves a named type to its JSON-schema string.
pub trait SchemaProvider: Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<String>;
}

/// In-memory schema table with case-insensitive names.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, String>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a JSON-schema string under a type name, replacing any
    /// existing entry
    pub fn register(&self, type_name: &str, schema: &str) -> Result<(), SchemaError> {
        if type_name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if let Err(e) = serde_json::from_str::<serde_json::Value>(schema) {
            return Err(SchemaError::InvalidSchema {
                type_name: type_name.to_string(),
                message: e.to_string(),
            });
        }
        let mut schemas = self
            .schemas
            .write()
            .map_err(|e| SchemaError::Internal(e.to_string()))?;
        schemas.insert(type_name.to_lowercase(), schema.to_string());
        Ok(())
    }

    /// All registered type names
    pub fn registered_types(&self) -> Vec<String> {
        self.schemas
            .read()
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn resolve(&self, type_name: &str) -> Option<String> {
        let schemas = self.schemas.read().ok()?;
        schemas.get(&type_name.to_lowercase()).cloned()
    }
}

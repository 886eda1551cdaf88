//! Function registry: name-addressed table of callable tool implementations.
//!
//! Functions take parsed JSON arguments and return a JSON string. Lookup is
//! case-insensitive; registering under an existing name replaces the entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Function errors
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("function name must not be empty")]
    EmptyName,

    #[error("invalid function arguments: {0}")]
    InvalidArguments(String),

    #[error("function execution failed: {0}")]
    Execution(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A callable tool implementation: parsed JSON in, JSON string out.
#[async_trait]
pub trait ScenarioFunction: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<String, FunctionError>;
}

struct FnScenarioFunction<F>(F);

#[async_trait]
impl<F> ScenarioFunction for FnScenarioFunction<F>
where
    F: Fn(Value) -> Result<String, FunctionError> + Send + Sync,
{
    async fn call(&self, arguments: Value) -> Result<String, FunctionError> {
        (self.0)(arguments)
    }
}

/// Case-insensitive mapping from name to callable function.
///
/// `register` replaces atomically; safe for concurrent callers.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, Arc<dyn ScenarioFunction>>>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any existing entry with the same name
    pub fn register(
        &self,
        name: &str,
        function: Arc<dyn ScenarioFunction>,
    ) -> Result<(), FunctionError> {
        if name.trim().is_empty() {
            return Err(FunctionError::EmptyName);
        }
        let mut functions = self
            .functions
            .write()
            .map_err(|e| FunctionError::Internal(e.to_string()))?;
        functions.insert(name.to_lowercase(), function);
        Ok(())
    }

    /// Register a plain closure as a function
    pub fn register_fn<F>(&self, name: &str, function: F) -> Result<(), FunctionError>
    where
        F: Fn(Value) -> Result<String, FunctionError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnScenarioFunction(function)))
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn ScenarioFunction>> {
        let functions = self.functions.read().ok()?;
        functions.get(&name.to_lowercase()).cloned()
    }

    /// All registered names
    pub fn names(&self) -> Vec<String> {
        self.functions
            .read()
            .map(|functions| functions.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_call_function() {
        let registry = FunctionRegistry::new();
        registry
            .register_fn("sum", |args| {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
                Ok((a + b).to_string())
            })
            .expect("register");

        let function = registry.get("SUM").expect("case-insensitive lookup");
        let result = function.call(json!({"a": 2, "b": 3})).await.expect("call");
        assert_eq!(result, "5");
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let registry = FunctionRegistry::new();
        let result = registry.register_fn("  ", |_| Ok(String::new()));
        assert!(matches!(result, Err(FunctionError::EmptyName)));
    }

    #[tokio::test]
    async fn test_register_replaces_existing_entry() {
        let registry = FunctionRegistry::new();
        registry
            .register_fn("echo", |_| Ok("first".to_string()))
            .expect("register");
        registry
            .register_fn("Echo", |_| Ok("second".to_string()))
            .expect("re-register");

        assert_eq!(registry.names(), vec!["echo".to_string()]);
        let function = registry.get("echo").expect("lookup");
        assert_eq!(function.call(json!({})).await.expect("call"), "second");
    }

    #[test]
    fn test_get_missing_function_returns_none() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("nope").is_none());
    }
}

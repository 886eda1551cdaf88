//! Context persistence middleware.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use cadenza_core::store::keys::{self, StageKeys};
use cadenza_core::store::{ConversationTurn, ItemStore, StoreError, TurnStore};
use cadenza_core::types::CompletionResult;

use crate::pipeline::{Next, PipelineError, StageExecutionContext, StageMiddleware};

/// After the rest of the chain completes, persists every completion result
/// to the item store under the canonical key schema, and records the
/// conversation turns to the turn store.
///
/// Writes fan out concurrently; a failed write fails the stage. There is no
/// rollback of writes that already landed.
pub struct ContextStoreMiddleware {
    items: Arc<dyn ItemStore>,
    turns: Arc<dyn TurnStore>,
}

impl ContextStoreMiddleware {
    /// Create the middleware over the given stores
    pub fn new(items: Arc<dyn ItemStore>, turns: Arc<dyn TurnStore>) -> Self {
        Self { items, turns }
    }

    fn collect_writes(
        stage_keys: &StageKeys,
        result: &CompletionResult,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let mut writes: Vec<(String, Value)> = Vec::new();

        if let Some(system_prompt) = &result.system_prompt {
            if !system_prompt.is_empty() {
                writes.push((
                    stage_keys.input(keys::INPUT_SYSTEM_PROMPT),
                    Value::String(system_prompt.clone()),
                ));
            }
        }
        writes.push((
            stage_keys.input(keys::INPUT_USER_PROMPT),
            Value::String(result.user_prompt.content.clone()),
        ));
        for (name, value) in &result.metadata.request {
            writes.push((stage_keys.input_param(name), Value::String(value.clone())));
        }

        writes.push((
            stage_keys.output(),
            Value::String(result.content.clone()),
        ));
        let execution_id = result
            .metadata
            .id
            .clone()
            .unwrap_or_else(|| stage_keys.stage_key().to_string());
        writes.push((
            stage_keys.output_param(keys::OUTPUT_EXECUTION_ID),
            Value::String(execution_id),
        ));

        if let Some(model) = &result.metadata.model {
            writes.push((
                stage_keys.metadata(keys::METADATA_OUTPUT_MODEL),
                Value::String(model.clone()),
            ));
        }
        if let Some(finish_reason) = &result.metadata.finish_reason {
            writes.push((
                stage_keys.metadata(keys::METADATA_FINISH_REASON),
                Value::String(finish_reason.clone()),
            ));
        }

        for call in &result.metadata.tool_calls {
            let audit =
                serde_json::to_value(call).map_err(|e| StoreError::Serialization(e.to_string()))?;
            writes.push((stage_keys.tool(&call.function_name, &call.id), audit));
        }

        if let Some(tokens) = result.metadata.input_tokens {
            writes.push((
                stage_keys.metadata(keys::METADATA_INPUT_TOKENS),
                Value::from(tokens),
            ));
        }
        if let Some(tokens) = result.metadata.output_tokens {
            writes.push((
                stage_keys.metadata(keys::METADATA_OUTPUT_TOKENS),
                Value::from(tokens),
            ));
        }
        if let Some(tokens) = result.metadata.total_tokens {
            writes.push((
                stage_keys.metadata(keys::METADATA_TOTAL_TOKENS),
                Value::from(tokens),
            ));
        }

        Ok(writes)
    }

    async fn persist_result(
        &self,
        session_id: &str,
        stage_id: i64,
        index: usize,
        result: &CompletionResult,
    ) -> Result<(), StoreError> {
        let stage_keys = StageKeys::new(stage_id, index);
        let writes = Self::collect_writes(&stage_keys, result)?;
        let write_count = writes.len();

        try_join_all(writes.into_iter().map(|(key, value)| {
            let items = Arc::clone(&self.items);
            let session = session_id.to_string();
            async move { items.save_item(&session, &key, value, None).await }
        }))
        .await?;

        self.turns
            .save_turn(
                session_id,
                ConversationTurn::user(result.user_prompt.content.clone())
                    .with_name(stage_keys.stage_key()),
                None,
            )
            .await?;
        self.turns
            .save_turn(
                session_id,
                ConversationTurn::assistant(result.content.clone())
                    .with_name(stage_keys.stage_key()),
                None,
            )
            .await?;

        debug!(
            session_id,
            stage_key = %stage_keys.stage_key(),
            write_count,
            "stage result persisted"
        );
        Ok(())
    }
}

#[async_trait]
impl StageMiddleware for ContextStoreMiddleware {
    async fn invoke(
        &self,
        ctx: &mut StageExecutionContext,
        next: Next<'_>,
    ) -> Result<(), PipelineError> {
        next.run(ctx).await?;

        if ctx.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        for (index, result) in ctx.results.iter().enumerate() {
            self.persist_result(&ctx.session_id, ctx.stage.id, index, result)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::adapter::CancellationToken;
    use cadenza_core::types::{
        CompletionMetadata, PromptTurn, RuntimeStage, ToolCallAudit, TurnRole,
    };
    use cadenza_stores::{InMemoryItemStore, InMemoryTurnStore, TurnStoreOptions};
    use serde_json::json;
    use std::collections::HashMap;

    use crate::pipeline::StagePipeline;

    fn result_with_metadata() -> CompletionResult {
        CompletionResult {
            session_id: "s1".to_string(),
            system_prompt: Some("Be terse.".to_string()),
            user_prompt: PromptTurn::user("Hello s1").with_name("1-1"),
            content: "hi".to_string(),
            metadata: CompletionMetadata {
                id: Some("r1".to_string()),
                model: Some("m".to_string()),
                finish_reason: Some("stop".to_string()),
                tool_calls: vec![ToolCallAudit {
                    id: "call_1".to_string(),
                    function_name: "sum".to_string(),
                    arguments: json!({"a":2,"b":3}),
                    result: "5".to_string(),
                }],
                input_tokens: Some(10),
                output_tokens: Some(5),
                total_tokens: Some(15),
                request: HashMap::from([("history_depth".to_string(), "0".to_string())]),
            },
        }
    }

    async fn run_persist(result: CompletionResult) -> (Arc<InMemoryItemStore>, Arc<InMemoryTurnStore>) {
        let items = Arc::new(InMemoryItemStore::new());
        let turns =
            Arc::new(InMemoryTurnStore::new(TurnStoreOptions::default()).expect("options"));
        let pipeline = StagePipeline::new(vec![Arc::new(ContextStoreMiddleware::new(
            items.clone(),
            turns.clone(),
        ))]);

        let stage = RuntimeStage {
            id: 1,
            name: "only".to_string(),
            turns: vec![PromptTurn::user("Hello {{sessionId}}")],
            model: Some("m".to_string()),
            parameters: Default::default(),
        };
        let mut ctx = StageExecutionContext::new(
            "s1",
            stage,
            HashMap::new(),
            CancellationToken::new(),
        );
        ctx.results.push(result);
        pipeline.run(&mut ctx).await.expect("run");
        (items, turns)
    }

    #[tokio::test]
    async fn test_persists_the_full_key_schema() {
        let (items, _turns) = run_persist(result_with_metadata()).await;

        let load = |key: &str| {
            let items = items.clone();
            let key = key.to_string();
            async move { items.load_item("s1", &key).await.expect("load") }
        };

        assert_eq!(
            load("stage:1-1:input:system_prompt").await,
            Some(json!("Be terse."))
        );
        assert_eq!(
            load("stage:1-1:input:user_prompt").await,
            Some(json!("Hello s1"))
        );
        assert_eq!(
            load("stage:1-1:input:params:history_depth").await,
            Some(json!("0"))
        );
        assert_eq!(load("stage:1-1:output").await, Some(json!("hi")));
        assert_eq!(
            load("stage:1-1:output:params:execution_id").await,
            Some(json!("r1"))
        );
        assert_eq!(
            load("stage:1-1:metadata:output_model").await,
            Some(json!("m"))
        );
        assert_eq!(
            load("stage:1-1:metadata:finish_reason").await,
            Some(json!("stop"))
        );
        assert_eq!(
            load("stage:1-1:metadata:input_tokens").await,
            Some(json!(10))
        );
        assert_eq!(
            load("stage:1-1:metadata:total_tokens").await,
            Some(json!(15))
        );

        let audit = load("stage:1-1:tool:sum:call_1").await.expect("audit");
        assert_eq!(audit["functionName"], json!("sum"));
        assert_eq!(audit["result"], json!("5"));
    }

    #[tokio::test]
    async fn test_empty_system_prompt_is_not_persisted() {
        let mut result = result_with_metadata();
        result.system_prompt = Some(String::new());
        let (items, _turns) = run_persist(result).await;

        assert_eq!(
            items
                .load_item("s1", "stage:1-1:input:system_prompt")
                .await
                .expect("load"),
            None
        );
    }

    #[tokio::test]
    async fn test_missing_provider_id_falls_back_to_the_stage_key() {
        let mut result = result_with_metadata();
        result.metadata.id = None;
        let (items, _turns) = run_persist(result).await;

        assert_eq!(
            items
                .load_item("s1", "stage:1-1:output:params:execution_id")
                .await
                .expect("load"),
            Some(json!("1-1"))
        );
    }

    #[tokio::test]
    async fn test_conversation_turns_are_recorded_newest_first() {
        let (_items, turns) = run_persist(result_with_metadata()).await;

        let history = turns.load_turns("s1", None).await.expect("load");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::Assistant);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].role, TurnRole::User);
        assert_eq!(history[1].content, "Hello s1");
    }
}

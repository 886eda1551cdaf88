//! LLM request middleware.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use cadenza_core::adapter::CompletionAdapter;

use crate::pipeline::{Next, PipelineError, StageExecutionContext, StageMiddleware};

/// Invokes the completion adapter once per user turn, in declared order,
/// appending each result to the execution context.
pub struct LlmRequestMiddleware {
    adapter: Arc<dyn CompletionAdapter>,
}

impl LlmRequestMiddleware {
    /// Create the middleware over the given adapter
    pub fn new(adapter: Arc<dyn CompletionAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl StageMiddleware for LlmRequestMiddleware {
    async fn invoke(
        &self,
        ctx: &mut StageExecutionContext,
        next: Next<'_>,
    ) -> Result<(), PipelineError> {
        if ctx.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let model = ctx.stage.model.clone().ok_or_else(|| {
            PipelineError::InvalidInput(format!("stage '{}' has no model", ctx.stage.name))
        })?;
        let prompts = ctx
            .stage
            .to_completion_prompts(&ctx.session_id, &ctx.metadata);
        if prompts.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "stage '{}' has no user turns",
                ctx.stage.name
            )));
        }

        for prompt in prompts {
            debug!(
                session_id = %ctx.session_id,
                stage = %ctx.stage.name,
                model = %model,
                "requesting completion"
            );
            let result = self
                .adapter
                .complete(&model, &prompt, &ctx.cancellation)
                .await?;
            ctx.results.push(result);
        }

        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::adapter::{AdapterError, CancellationToken};
    use cadenza_core::types::{
        CompletionMetadata, CompletionPrompt, CompletionResult, PromptTurn, RuntimeStage,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::pipeline::StagePipeline;

    struct EchoAdapter {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionAdapter for EchoAdapter {
        fn supported_models(&self) -> Vec<String> {
            vec!["m".to_string()]
        }

        async fn complete(
            &self,
            _model: &str,
            prompt: &CompletionPrompt,
            _cancel: &CancellationToken,
        ) -> Result<CompletionResult, AdapterError> {
            self.calls.lock().unwrap().push(prompt.user.content.clone());
            Ok(CompletionResult {
                session_id: prompt.session_id.clone(),
                system_prompt: None,
                user_prompt: prompt.user.clone(),
                content: format!("echo: {}", prompt.user.content),
                metadata: CompletionMetadata {
                    request: prompt.metadata.clone(),
                    ..CompletionMetadata::default()
                },
            })
        }
    }

    #[tokio::test]
    async fn test_one_result_per_user_turn_in_order() {
        let adapter = Arc::new(EchoAdapter {
            calls: Mutex::new(Vec::new()),
        });
        let stage = RuntimeStage {
            id: 1,
            name: "only".to_string(),
            turns: vec![PromptTurn::user("first"), PromptTurn::user("second")],
            model: Some("m".to_string()),
            parameters: Default::default(),
        };
        let pipeline =
            StagePipeline::new(vec![Arc::new(LlmRequestMiddleware::new(adapter.clone()))]);
        let mut ctx = StageExecutionContext::new(
            "s1",
            stage,
            HashMap::new(),
            CancellationToken::new(),
        );
        pipeline.run(&mut ctx).await.expect("run");

        assert_eq!(ctx.results.len(), 2);
        assert_eq!(ctx.results[0].content, "echo: first");
        assert_eq!(ctx.results[1].content, "echo: second");
        assert_eq!(*adapter.calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_stage_without_model_is_rejected() {
        let adapter = Arc::new(EchoAdapter {
            calls: Mutex::new(Vec::new()),
        });
        let stage = RuntimeStage {
            id: 1,
            name: "only".to_string(),
            turns: vec![PromptTurn::user("hi")],
            model: None,
            parameters: Default::default(),
        };
        let pipeline = StagePipeline::new(vec![Arc::new(LlmRequestMiddleware::new(adapter))]);
        let mut ctx = StageExecutionContext::new(
            "s1",
            stage,
            HashMap::new(),
            CancellationToken::new(),
        );

        assert!(matches!(
            pipeline.run(&mut ctx).await,
            Err(PipelineError::InvalidInput(_))
        ));
    }
}

//! Placeholder validation middleware.

use async_trait::async_trait;

use cadenza_core::types::TurnRole;

use crate::pipeline::{Next, PipelineError, StageExecutionContext, StageMiddleware};
use crate::placeholder::find_markers;

/// Asserts that no `{{...}}`/`{...}` marker remains in user-turn content
/// after population. Uses the same scanner as the populate middleware, so
/// the two phases cannot disagree on what counts as a marker.
pub struct PlaceholderValidationMiddleware;

#[async_trait]
impl StageMiddleware for PlaceholderValidationMiddleware {
    async fn invoke(
        &self,
        ctx: &mut StageExecutionContext,
        next: Next<'_>,
    ) -> Result<(), PipelineError> {
        for turn in ctx.stage.turns.iter().filter(|t| t.role == TurnRole::User) {
            if let Some(marker) = find_markers(&turn.content).first() {
                let (start, end) = marker.span();
                return Err(PipelineError::UnresolvedPlaceholder {
                    marker: turn.content[start..end].to_string(),
                    turn: turn
                        .name
                        .clone()
                        .unwrap_or_else(|| turn.role.as_str().to_string()),
                });
            }
        }
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::adapter::CancellationToken;
    use cadenza_core::types::{PromptTurn, RuntimeStage};
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::pipeline::StagePipeline;

    async fn run_stage(content: &str) -> Result<(), PipelineError> {
        let stage = RuntimeStage {
            id: 1,
            name: "only".to_string(),
            turns: vec![PromptTurn::user(content).with_name("1-1")],
            model: Some("m".to_string()),
            parameters: Default::default(),
        };
        let pipeline = StagePipeline::new(vec![Arc::new(PlaceholderValidationMiddleware)]);
        let mut ctx = StageExecutionContext::new(
            "s1",
            stage,
            HashMap::new(),
            CancellationToken::new(),
        );
        pipeline.run(&mut ctx).await
    }

    #[tokio::test]
    async fn test_leftover_context_marker_is_rejected() {
        match run_stage("Hi {{nope}}").await {
            Err(PipelineError::UnresolvedPlaceholder { marker, turn }) => {
                assert_eq!(marker, "{{nope}}");
                assert_eq!(turn, "1-1");
            }
            other => panic!("expected unresolved placeholder, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_leftover_parameter_marker_is_rejected() {
        assert!(matches!(
            run_stage("Hi {style}").await,
            Err(PipelineError::UnresolvedPlaceholder { .. })
        ));
    }

    #[tokio::test]
    async fn test_literal_braces_pass() {
        assert!(run_stage("give JSON {x:1} and {\"y\":2}").await.is_ok());
    }
}

//! Context population middleware.

use std::sync::Arc;

use async_trait::async_trait;

use cadenza_core::store::ItemStore;
use cadenza_core::types::TurnRole;

use crate::pipeline::{Next, PipelineError, StageExecutionContext, StageMiddleware};
use crate::placeholder::PlaceholderResolver;

/// Rewrites each user turn's content with its resolved form before
/// continuing the chain. System and assistant turns pass through unchanged.
pub struct ContextPopulationMiddleware {
    items: Arc<dyn ItemStore>,
}

impl ContextPopulationMiddleware {
    /// Create the middleware over the given item store
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl StageMiddleware for ContextPopulationMiddleware {
    async fn invoke(
        &self,
        ctx: &mut StageExecutionContext,
        next: Next<'_>,
    ) -> Result<(), PipelineError> {
        if ctx.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let session_id = ctx.session_id.clone();
        let parameters = ctx.stage.parameters.clone();
        let resolver = PlaceholderResolver::new(self.items.as_ref(), &session_id, &parameters);

        for turn in ctx.stage.turns.iter_mut() {
            if turn.role == TurnRole::User {
                turn.content = resolver.resolve(&turn.content).await?;
            }
        }

        next.run(ctx).await
    }
}

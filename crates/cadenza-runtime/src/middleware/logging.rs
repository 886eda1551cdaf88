//! Logging middleware.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::pipeline::{Next, PipelineError, StageExecutionContext, StageMiddleware};

/// Brackets the rest of the chain with start/finish log lines and a
/// duration measurement.
pub struct LoggingMiddleware;

#[async_trait]
impl StageMiddleware for LoggingMiddleware {
    async fn invoke(
        &self,
        ctx: &mut StageExecutionContext,
        next: Next<'_>,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        info!(
            session_id = %ctx.session_id,
            stage = %ctx.stage.name,
            execution_id = %ctx.execution_id,
            "stage step started"
        );

        let result = next.run(ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => info!(
                session_id = %ctx.session_id,
                stage = %ctx.stage.name,
                execution_id = %ctx.execution_id,
                duration_ms,
                result_count = ctx.results.len(),
                "stage step finished"
            ),
            Err(e) => warn!(
                session_id = %ctx.session_id,
                stage = %ctx.stage.name,
                execution_id = %ctx.execution_id,
                duration_ms,
                error = %e,
                "stage step failed"
            ),
        }

        result
    }
}

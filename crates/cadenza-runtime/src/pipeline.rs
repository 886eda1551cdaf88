//! Stage middleware pipeline.
//!
//! Middlewares compose as a russian-doll chain: each receives the shared
//! execution context and a `Next` handle continuing the remainder of the
//! chain, and may run code before and/or after `next`. The pipeline never
//! recovers: any failure propagates up and aborts the stage, leaving
//! already-persisted state intact.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use cadenza_core::adapter::{AdapterError, CancellationToken};
use cadenza_core::store::StoreError;
use cadenza_core::types::{CompletionResult, RuntimeStage};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unresolved placeholder '{marker}' in turn '{turn}'")]
    UnresolvedPlaceholder { marker: String, turn: String },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stage execution cancelled")]
    Cancelled,
}

/// Mutable state shared by the middlewares of one stage run.
///
/// Owned exclusively by the running pipeline; middlewares receive a mutable
/// handle and must not retain it past their `next` completion.
pub struct StageExecutionContext {
    pub session_id: String,
    /// The stage under execution; the populate middleware rewrites its
    /// user-turn contents in place.
    pub stage: RuntimeStage,
    /// Execution scratch, carried across the stages of one scenario run.
    pub metadata: HashMap<String, String>,
    /// Append-only list of completion results.
    pub results: Vec<CompletionResult>,
    /// Unique id of this pipeline run, for log correlation.
    pub execution_id: String,
    pub cancellation: CancellationToken,
}

impl StageExecutionContext {
    /// Create a context for one stage run
    pub fn new(
        session_id: impl Into<String>,
        stage: RuntimeStage,
        metadata: HashMap<String, String>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            stage,
            metadata,
            results: Vec::new(),
            execution_id: Uuid::new_v4().to_string(),
            cancellation,
        }
    }
}

/// A composable unit in the stage-execution chain.
#[async_trait]
pub trait StageMiddleware: Send + Sync {
    async fn invoke(
        &self,
        ctx: &mut StageExecutionContext,
        next: Next<'_>,
    ) -> Result<(), PipelineError>;
}

/// The remainder of the middleware chain.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn StageMiddleware>],
}

impl<'a> Next<'a> {
    /// Continue with the next middleware, or finish the chain
    pub async fn run(self, ctx: &mut StageExecutionContext) -> Result<(), PipelineError> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.invoke(ctx, Next { middlewares: rest }).await,
            None => Ok(()),
        }
    }
}

/// An ordered middleware chain invoked once per stage.
pub struct StagePipeline {
    middlewares: Vec<Arc<dyn StageMiddleware>>,
}

impl StagePipeline {
    /// Create a pipeline from an ordered middleware list
    pub fn new(middlewares: Vec<Arc<dyn StageMiddleware>>) -> Self {
        Self { middlewares }
    }

    /// Run the chain over the given execution context
    pub async fn run(&self, ctx: &mut StageExecutionContext) -> Result<(), PipelineError> {
        if ctx.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Next {
            middlewares: &self.middlewares,
        }
        .run(ctx)
        .await
    }
}

//! Scenario orchestrator: the entry point running scenarios stage by stage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use cadenza_core::adapter::CancellationToken;
use cadenza_core::types::{CompletionResult, RuntimeStage};

use crate::pipeline::{PipelineError, StageExecutionContext, StagePipeline};
use crate::registry::{RegistryError, ScenarioRegistry};

/// Orchestrator errors
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("stage {stage_id} not found in scenario '{scenario}'")]
    StageNotFound { scenario: String, stage_id: i64 },

    #[error("stage '{stage}' failed for session '{session}': {source}")]
    Stage {
        stage: String,
        session: String,
        #[source]
        source: PipelineError,
    },
}

impl From<RegistryError> for OrchestratorError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NotFound(name) => OrchestratorError::ScenarioNotFound(name),
        }
    }
}

/// Runs scenarios by walking each stage through the middleware pipeline.
///
/// Stages run sequentially within a session: a later stage's placeholders
/// may depend on earlier stages' persisted outputs. The per-run metadata
/// map threads through every stage's execution context in order.
pub struct ScenarioOrchestrator {
    registry: Arc<ScenarioRegistry>,
    pipeline: StagePipeline,
}

impl ScenarioOrchestrator {
    /// Create an orchestrator over the given registry and pipeline
    pub fn new(registry: Arc<ScenarioRegistry>, pipeline: StagePipeline) -> Self {
        Self { registry, pipeline }
    }

    /// Execute every stage of a scenario in declared order.
    ///
    /// Returns one result list per stage; each list holds one completion
    /// result per user turn.
    pub async fn execute_scenario(
        &self,
        session_id: &str,
        scenario_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<CompletionResult>>, OrchestratorError> {
        let scenario = self.registry.get_scenario(scenario_name).await?;
        info!(
            session_id,
            scenario = %scenario.name,
            stage_count = scenario.stages.len(),
            "scenario execution started"
        );

        let mut metadata: HashMap<String, String> = HashMap::new();
        let mut results = Vec::with_capacity(scenario.stages.len());
        for stage in &scenario.stages {
            let (stage_results, carried) = self
                .run_stage(session_id, stage, std::mem::take(&mut metadata), cancel)
                .await?;
            metadata = carried;
            results.push(stage_results);
        }

        info!(
            session_id,
            scenario = %scenario.name,
            "scenario execution finished"
        );
        Ok(results)
    }

    /// Execute a single stage of a scenario with a fresh metadata map
    pub async fn execute_stage(
        &self,
        session_id: &str,
        scenario_name: &str,
        stage_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompletionResult>, OrchestratorError> {
        let scenario = self.registry.get_scenario(scenario_name).await?;
        let stage = scenario
            .stage(stage_id)
            .ok_or_else(|| OrchestratorError::StageNotFound {
                scenario: scenario.name.clone(),
                stage_id,
            })?;

        let (results, _metadata) = self
            .run_stage(session_id, stage, HashMap::new(), cancel)
            .await?;
        Ok(results)
    }

    async fn run_stage(
        &self,
        session_id: &str,
        stage: &RuntimeStage,
        metadata: HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<CompletionResult>, HashMap<String, String>), OrchestratorError> {
        let mut ctx =
            StageExecutionContext::new(session_id, stage.clone(), metadata, cancel.clone());
        let started = Instant::now();
        info!(session_id, stage = %stage.name, stage_id = stage.id, "stage started");

        match self.pipeline.run(&mut ctx).await {
            Ok(()) => {
                info!(
                    session_id,
                    stage = %stage.name,
                    stage_id = stage.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    result_count = ctx.results.len(),
                    "stage finished"
                );
                Ok((ctx.results, ctx.metadata))
            }
            Err(e) => {
                warn!(
                    session_id,
                    stage = %stage.name,
                    stage_id = stage.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "stage failed"
                );
                Err(OrchestratorError::Stage {
                    stage: stage.name.clone(),
                    session: session_id.to_string(),
                    source: e,
                })
            }
        }
    }
}

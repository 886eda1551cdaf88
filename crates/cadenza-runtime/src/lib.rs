//! # Cadenza Runtime
//!
//! Scenario execution for the Cadenza runtime:
//! - ScenarioRegistry: multi-store aggregation with a warm concurrent cache
//! - Placeholder resolution from the session context store
//! - The stage middleware pipeline (populate → validate → llm → log → persist)
//! - ScenarioOrchestrator: the entry point running scenarios stage by stage

pub mod middleware;
mod orchestrator;
mod pipeline;
mod placeholder;
mod registry;

pub use orchestrator::{OrchestratorError, ScenarioOrchestrator};
pub use pipeline::{Next, PipelineError, StageExecutionContext, StageMiddleware, StagePipeline};
pub use placeholder::{find_markers, Marker, PlaceholderResolver};
pub use registry::{RegistryError, ScenarioRegistry};

// Re-export core types for convenience
pub use cadenza_core::prelude::*;

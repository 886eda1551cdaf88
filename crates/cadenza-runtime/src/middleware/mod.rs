//! Standard stage middlewares.
//!
//! The standard chain order is:
//! 1. ContextPopulationMiddleware: resolve placeholders from the context
//! 2. PlaceholderValidationMiddleware: reject leftover markers
//! 3. LlmRequestMiddleware: one adapter call per user turn
//! 4. LoggingMiddleware: bracket the rest with timing
//! 5. ContextStoreMiddleware: persist results to the context store

mod llm;
mod logging;
mod persist;
mod populate;
mod validate;

pub use llm::LlmRequestMiddleware;
pub use logging::LoggingMiddleware;
pub use persist::ContextStoreMiddleware;
pub use populate::ContextPopulationMiddleware;
pub use validate::PlaceholderValidationMiddleware;

use std::sync::Arc;

use cadenza_core::adapter::CompletionAdapter;
use cadenza_core::store::{ItemStore, TurnStore};

use crate::pipeline::{StageMiddleware, StagePipeline};

/// The standard pipeline in its canonical order.
pub fn standard_pipeline(
    items: Arc<dyn ItemStore>,
    turns: Arc<dyn TurnStore>,
    adapter: Arc<dyn CompletionAdapter>,
) -> StagePipeline {
    let middlewares: Vec<Arc<dyn StageMiddleware>> = vec![
        Arc::new(ContextPopulationMiddleware::new(Arc::clone(&items))),
        Arc::new(PlaceholderValidationMiddleware),
        Arc::new(LlmRequestMiddleware::new(adapter)),
        Arc::new(LoggingMiddleware),
        Arc::new(ContextStoreMiddleware::new(items, turns)),
    ];
    StagePipeline::new(middlewares)
}

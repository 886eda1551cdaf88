//! # Cadenza Stores
//!
//! Store implementations for the Cadenza scenario runtime:
//! - In-memory turn and item stores (development, testing, single-process)
//! - In-memory scenario store for administrative flows
//! - Filesystem scenario store loading definitions from a directory

mod file_store;
mod item_store;
mod scenario_store;
mod turn_store;

pub use file_store::FileScenarioStore;
pub use item_store::InMemoryItemStore;
pub use scenario_store::InMemoryScenarioStore;
pub use turn_store::{InMemoryTurnStore, TurnStoreOptions};

//! Application state.

use std::sync::Arc;

use ledger_store::Store;

use crate::config::ServiceConfig;
use crate::engine::Ledger;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger engine.
    pub ledger: Ledger,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        Self {
            ledger: Ledger::new(store),
            config,
        }
    }
}

//! Application state shared across handlers.

use satchel_core::AppConfig;
use satchel_metadata::TransferStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub store: Arc<dyn TransferStore>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, store: Arc<dyn TransferStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use bramble_core::Storage;

use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Handlers never learn which
/// storage backend they are talking to.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storage: Arc<dyn Storage>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, storage }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the storage port.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.inner.storage.as_ref()
    }
}

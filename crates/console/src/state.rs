//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, ServiceFlowClient};
use crate::config::ConsoleConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ConsoleConfig,
    api: ServiceFlowClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the ServiceFlow HTTP client cannot be built.
    pub fn new(config: ConsoleConfig) -> Result<Self, ApiError> {
        let api = ServiceFlowClient::new(&config.api, config.cache_ttl)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, api }),
        })
    }

    /// Get a reference to the console configuration.
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    /// Get a reference to the ServiceFlow API client.
    #[must_use]
    pub fn api(&self) -> &ServiceFlowClient {
        &self.inner.api
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::backends::{BackendInitError, Backends};
use crate::config::{ConfigError, FrontendConfig};
use crate::consolidation::Consolidator;

/// Error creating the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("backend client error: {0}")]
    Backends(#[from] BackendInitError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration and the consolidation layer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: FrontendConfig,
    consolidator: Consolidator,
}

impl AppState {
    /// Create the application state with HTTP clients for every backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate table or a backend client is invalid.
    pub fn new(config: FrontendConfig) -> Result<Self, StateError> {
        let backends = Backends::http(&config.backends, config.backend_timeout)?;
        Self::with_backends(config, backends)
    }

    /// Create the application state over the given backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured exchange rates are invalid.
    pub fn with_backends(config: FrontendConfig, backends: Backends) -> Result<Self, StateError> {
        let converter = Arc::new(config.converter()?);
        Ok(Self {
            inner: Arc::new(AppStateInner {
                consolidator: Consolidator::new(backends, converter),
                config,
            }),
        })
    }

    /// Get a reference to the frontend configuration.
    #[must_use]
    pub fn config(&self) -> &FrontendConfig {
        &self.inner.config
    }

    /// Get a reference to the consolidation layer.
    #[must_use]
    pub fn consolidator(&self) -> &Consolidator {
        &self.inner.consolidator
    }

    /// Prefix `path` with the configured base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.config.base_url)
    }
}

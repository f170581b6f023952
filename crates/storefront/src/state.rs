//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::commerce::{CommerceError, StoreClient};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the configuration, the session database
/// pool and the Store API client with its catalog cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    store: StoreClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Store API client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, CommerceError> {
        let store = StoreClient::new(&config.commerce)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Store API client.
    #[must_use]
    pub fn store(&self) -> &StoreClient {
        &self.inner.store
    }
}

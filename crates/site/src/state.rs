//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::SiteConfig;
use crate::realtime::OrderEvents;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    pool: PgPool,
    order_events: OrderEvents,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: SiteConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                order_events: OrderEvents::new(),
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the order-change event hub.
    #[must_use]
    pub fn order_events(&self) -> &OrderEvents {
        &self.inner.order_events
    }
}

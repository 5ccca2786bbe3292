//! Shared application state for the Axum API server.

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use pulse_common::config::AppConfig;
use pulse_notifier::queue::QueueClient;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    /// Publish side of the notification queue.
    pub queue: QueueClient,
}

impl AppState {
    pub fn new(pool: PgPool, redis: ConnectionManager, config: AppConfig) -> Self {
        let queue = QueueClient::publisher(redis);
        Self {
            pool,
            config,
            queue,
        }
    }
}

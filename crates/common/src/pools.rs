//! Connection pools for the two stores RentPulse talks to: PostgreSQL for
//! the relational data and Redis for the notification queue. Both are built
//! from [`AppConfig`] so sizing and endpoints stay in one place.

use redis::Client;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// How long a checkout may wait for a free connection before failing the
/// query instead of queueing behind a saturated pool.
const DB_ACQUIRE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Create the PostgreSQL connection pool, sized by
/// [`AppConfig::db_max_connections`].
pub async fn create_db_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(DB_ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Create the Redis connection manager backing the notification queue.
///
/// The manager transparently reconnects after broker restarts, so callers can
/// hold one clone per task without re-dialing themselves.
pub async fn create_redis_pool(config: &AppConfig) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(config.redis_url.as_str())?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}

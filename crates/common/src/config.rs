use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (broker for the notification queue)
    pub redis_url: String,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// SMTP submission endpoint as host:port
    pub smtp_server: Option<String>,

    /// SMTP auth identity, also used as the From address
    pub smtp_username: Option<String>,

    /// SMTP auth secret
    pub smtp_password: Option<String>,

    /// Number of notification worker loops (default: 3)
    pub notifier_workers: usize,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// API listen port (default: 3000)
    pub port: u16,
}

/// SMTP settings required by the notifier process.
///
/// Split out of [`AppConfig`] so the API server can start without SMTP
/// credentials while the notifier treats a missing value as fatal.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    /// host:port of the submission endpoint
    pub server: String,
    /// Auth identity; doubles as the From address
    pub username: String,
    pub password: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?,
            smtp_server: std::env::var("SMTP_SERVER").ok(),
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            notifier_workers: std::env::var("NOTIFIER_WORKERS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFIER_WORKERS must be a valid usize"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
        })
    }

    /// Resolve the SMTP settings, failing if any piece is missing.
    ///
    /// The notifier calls this at startup; a missing value is a configuration
    /// error reported to the caller, not a panic.
    pub fn smtp(&self) -> anyhow::Result<SmtpSettings> {
        Ok(SmtpSettings {
            server: self
                .smtp_server
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SMTP_SERVER environment variable is required"))?,
            username: self
                .smtp_username
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SMTP_USERNAME environment variable is required"))?,
            password: self
                .smtp_password
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SMTP_PASSWORD environment variable is required"))?,
        })
    }
}

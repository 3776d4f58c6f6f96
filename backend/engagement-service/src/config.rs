/// Configuration management for the engagement service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Fan-out gateway configuration
    pub gateway: GatewayConfig,
    /// Counter reconciliation configuration
    pub reconciliation: ReconciliationConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port for health checks and the WebSocket gateway
    pub http_port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port or redis+sentinel://...)
    pub url: String,
}

/// Fan-out gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the auth collaborator used to verify bearer credentials
    pub auth_url: String,
    /// Seconds between heartbeat pings to each connection
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Seconds without a pong before a connection is dropped
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,
}

/// Counter reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Seconds between sweeps
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    /// How far back to look for engagement activity when picking videos
    #[serde(default = "default_reconcile_lookback_secs")]
    pub lookback_secs: u64,
    /// Absolute counter divergence tolerated before the cache is overwritten
    #[serde(default)]
    pub tolerance: i64,
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_heartbeat_secs() -> u64 {
    5
}

fn default_client_timeout_secs() -> u64 {
    30
}

fn default_reconcile_interval_secs() -> u64 {
    180
}

fn default_reconcile_lookback_secs() -> u64 {
    900
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8011), // engagement-service default HTTP port
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_connections),
            min_connections: std::env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_connections),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL")
                .context("REDIS_URL environment variable not set")?,
        };

        let gateway = GatewayConfig {
            auth_url: std::env::var("AUTH_SERVICE_URL")
                .unwrap_or_else(|_| "http://auth-service:8001".to_string()),
            heartbeat_secs: std::env::var("GATEWAY_HEARTBEAT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_heartbeat_secs),
            client_timeout_secs: std::env::var("GATEWAY_CLIENT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_client_timeout_secs),
        };

        let reconciliation = ReconciliationConfig {
            interval_secs: std::env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_reconcile_interval_secs),
            lookback_secs: std::env::var("RECONCILE_LOOKBACK_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_reconcile_lookback_secs),
            tolerance: std::env::var("RECONCILE_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        };

        Ok(Config {
            app,
            database,
            redis,
            gateway,
            reconciliation,
        })
    }
}

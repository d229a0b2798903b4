//! Heirloom configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Heirloom configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeirloomConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Share-link issuance configuration
    #[serde(default)]
    pub share_links: ShareLinkConfig,

    /// Release sweeper configuration
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Notification dispatch configuration
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18620,
            cors_origins: Vec::new(),
        }
    }
}

/// Share-link issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLinkConfig {
    /// Minimum accepted ttl in seconds
    pub min_ttl_secs: i64,

    /// Maximum accepted ttl in seconds
    pub max_ttl_secs: i64,

    /// Token length in random bytes (256 bits default)
    pub token_bytes: usize,
}

impl Default for ShareLinkConfig {
    fn default() -> Self {
        Self {
            // 1 hour to 1 year, matching the product's share dialog
            min_ttl_secs: 3_600,
            max_ttl_secs: 365 * 24 * 3_600,
            token_bytes: 32,
        }
    }
}

/// Release sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Enable the periodic sweep loop
    pub enabled: bool,

    /// Seconds between sweep runs
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

/// Notification dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook URL release events are POSTed to (None = log only)
    pub webhook_url: Option<String>,

    /// Request timeout in seconds for webhook delivery
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout() -> u64 {
    10
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for persisted vault state
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".heirloom"),
        }
    }
}

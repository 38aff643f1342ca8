use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub store: StoreConfig,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub broker: Option<BrokerConfig>,
}

/// Watermark store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path to the last-runs CSV file.
    pub path: PathBuf,
    /// Bounded wait for the store lock before aborting the batch.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    1000
}

/// Delivery transport selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Which notifier carries run notifications for this deployment.
    /// Exactly one transport fires per detected run.
    pub transport: Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Http,
    Queue,
}

/// Reduction API (HTTP transport) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Deployment profile selecting which base URL is used.
    #[serde(default)]
    pub profile: ApiProfile,
    /// Base URL for the secure (internal) deployment.
    pub secure_url: String,
    /// Base URL for the public deployment.
    pub public_url: String,
    /// Bearer-style token, sent as `Authorization: Token <token>`.
    pub token: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiProfile {
    #[default]
    Secure,
    Public,
}

impl ApiConfig {
    /// The base URL selected by the active profile.
    pub fn base_url(&self) -> &str {
        match self.profile {
            ApiProfile::Secure => &self.secure_url,
            ApiProfile::Public => &self.public_url,
        }
    }
}

fn default_timeout() -> u32 {
    30
}

/// Message broker (queue transport) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Destination queue for run-started messages.
    pub destination: String,
    /// Cycle folder name used when constructing data file locations.
    pub cycle_folder: String,
    /// Pause after the handshake before first use. Works around a race
    /// observed broker-side when a fresh connection is used immediately.
    /// Set to 0 to disable.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// TCP connect + handshake timeout in seconds (default: 5)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u32,
    /// Ask the broker to persist messages (default: true)
    #[serde(default = "default_persistent")]
    pub persistent: bool,
    /// Message priority (default: 4)
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Optional broker-side delivery delay in milliseconds.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_persistent() -> bool {
    true
}

fn default_priority() -> u8 {
    4
}

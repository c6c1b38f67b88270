//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP/WS server to (0 = auto-allocate).
    /// Override: `TONEARM_BIND_PORT`
    pub bind_port: u16,

    /// Bound in seconds on a single remote artwork download.
    /// Override: `TONEARM_ARTWORK_TIMEOUT`
    pub artwork_fetch_timeout_secs: u64,

    /// Capacity of the event broadcast channel.
    pub broadcast_capacity: usize,

    /// Seconds between WebSocket heartbeat checks.
    pub heartbeat_check_interval_secs: u64,

    /// Seconds of inactivity before a WebSocket connection is dropped.
    pub heartbeat_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = tonearm_core::Config::default();
        Self {
            bind_port: core.preferred_port,
            artwork_fetch_timeout_secs: core.artwork_fetch_timeout_secs,
            broadcast_capacity: core.bridge.broadcast_capacity,
            heartbeat_check_interval_secs: core.bridge.heartbeat_check_interval_secs,
            heartbeat_timeout_secs: core.bridge.heartbeat_timeout_secs,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TONEARM_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("TONEARM_ARTWORK_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.artwork_fetch_timeout_secs = secs;
            }
        }
    }

    /// Converts to tonearm-core's Config type.
    pub fn to_core_config(&self) -> tonearm_core::Config {
        tonearm_core::Config {
            preferred_port: self.bind_port,
            artwork_fetch_timeout_secs: self.artwork_fetch_timeout_secs,
            bridge: tonearm_core::BridgeConfig {
                broadcast_capacity: self.broadcast_capacity,
                heartbeat_check_interval_secs: self.heartbeat_check_interval_secs,
                heartbeat_timeout_secs: self.heartbeat_timeout_secs,
            },
        }
    }
}

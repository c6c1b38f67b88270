//! Core application state types.
//!
//! Holds the validated runtime configuration shared across the API layer
//! and services. The server binary builds a [`Config`] from its YAML file
//! and environment overrides and hands it to the core.

use serde::{Deserialize, Serialize};

/// Configuration for the WebSocket bridge.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BridgeConfig {
    /// Capacity of the broadcast channel fanning events out to clients.
    pub broadcast_capacity: usize,

    /// Interval between heartbeat liveness checks (seconds).
    pub heartbeat_check_interval_secs: u64,

    /// A connection with no activity for this long is dropped (seconds).
    pub heartbeat_timeout_secs: u64,
}

impl BridgeConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.broadcast_capacity == 0 {
            return Err(
                "broadcast_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.heartbeat_timeout_secs <= self.heartbeat_check_interval_secs {
            return Err(
                "heartbeat_timeout_secs must exceed heartbeat_check_interval_secs".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            heartbeat_check_interval_secs: 10,
            heartbeat_timeout_secs: 60,
        }
    }
}

/// Configuration for the Tonearm server.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Preferred port for the HTTP/WS server (0 = auto-allocate).
    pub preferred_port: u16,

    /// Bound on a single remote artwork download (seconds).
    pub artwork_fetch_timeout_secs: u64,

    /// WebSocket bridge settings.
    pub bridge: BridgeConfig,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.artwork_fetch_timeout_secs == 0 {
            return Err("artwork_fetch_timeout_secs must be >= 1".to_string());
        }
        self.bridge.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            artwork_fetch_timeout_secs: 30,
            bridge: BridgeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_broadcast_capacity_is_rejected() {
        let mut config = Config::default();
        config.bridge.broadcast_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn heartbeat_timeout_must_exceed_check_interval() {
        let mut config = Config::default();
        config.bridge.heartbeat_timeout_secs = config.bridge.heartbeat_check_interval_secs;
        assert!(config.validate().is_err());
    }
}

//! Network Configuration
//!
//! Dial targets, connection limits and the timers driving the connect loop.

use super::endpoint::Endpoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum number of negotiated peers
pub const MAX_CONNECTED_PEERS: usize = 10;

/// Address the listener binds to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 20333,
        }
    }
}

/// Configuration of the peer connection manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    // === Endpoints ===

    /// Inbound listener; `None` runs outbound-only
    pub listen: Option<ListenConfig>,

    /// Bootstrap endpoints, kept as dial candidates even after failures
    pub seeds: Vec<Endpoint>,

    /// Endpoints dialed on every tick while not connected
    pub peer_seeds: Vec<Endpoint>,

    /// Our own public addresses, never dialed
    pub external_endpoints: Vec<Endpoint>,

    // === Limits ===

    pub max_connected_peers: usize,

    // === Timers ===

    /// Delay between connect loop ticks (milliseconds)
    pub connect_peers_delay_ms: u64,

    /// Delay between health sweeps (milliseconds)
    pub health_check_interval_ms: u64,

    /// Idle time after which a silent peer is closed (milliseconds)
    pub socket_timeout_ms: u64,

    /// TCP dial timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Upper bound on a whole handshake (milliseconds)
    pub negotiation_timeout_ms: u64,

    /// How long a failed or misbehaving endpoint stays out of rotation (seconds)
    pub blacklist_cooldown_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen: Some(ListenConfig::default()),
            seeds: Vec::new(),
            peer_seeds: Vec::new(),
            external_endpoints: Vec::new(),
            max_connected_peers: MAX_CONNECTED_PEERS,
            connect_peers_delay_ms: 5_000,
            health_check_interval_ms: 5_000,
            socket_timeout_ms: 60_000,
            connect_timeout_ms: 5_000,
            negotiation_timeout_ms: 30_000,
            blacklist_cooldown_secs: 300,
        }
    }
}

impl NetworkConfig {
    pub fn connect_peers_delay(&self) -> Duration {
        Duration::from_millis(self.connect_peers_delay_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }

    pub fn blacklist_cooldown(&self) -> Duration {
        Duration::from_secs(self.blacklist_cooldown_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_connected_peers == 0 {
            anyhow::bail!("max_connected_peers must be at least 1");
        }
        for (name, value) in [
            ("connect_peers_delay_ms", self.connect_peers_delay_ms),
            ("health_check_interval_ms", self.health_check_interval_ms),
            ("socket_timeout_ms", self.socket_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("negotiation_timeout_ms", self.negotiation_timeout_ms),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }
        if self.negotiation_timeout_ms > self.socket_timeout_ms {
            anyhow::bail!(
                "negotiation_timeout_ms ({}) must not exceed socket_timeout_ms ({})",
                self.negotiation_timeout_ms,
                self.socket_timeout_ms
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(NetworkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_peers_invalid() {
        let config = NetworkConfig {
            max_connected_peers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: NetworkConfig = toml::from_str(
            r#"
            seeds = ["tcp://127.0.0.1:20333"]
            max_connected_peers = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.max_connected_peers, 3);
        assert_eq!(config.seeds.len(), 1);
        assert_eq!(config.socket_timeout(), Duration::from_secs(60));
    }
}

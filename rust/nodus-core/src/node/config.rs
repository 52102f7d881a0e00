//! Node Configuration
//!
//! Loaded once at startup from TOML, overridden from the command line, then
//! passed down explicitly to every component.

use crate::mempool::DEFAULT_MEMPOOL_CAPACITY;
use crate::network::{Endpoint, ListenConfig, NetworkConfig};
use crate::protocol::payload::MAX_USER_AGENT_SIZE;
use crate::wire::DeserializeWireContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default network magic
pub const DEFAULT_MESSAGE_MAGIC: u32 = 7_630_401;

/// Wire protocol settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Magic carried by every message; peers with another magic are dropped
    pub message_magic: u32,

    /// User agent advertised in the version handshake
    pub user_agent: String,

    /// Time a peer may keep reporting the same height before it is evicted (seconds)
    pub unhealthy_peer_seconds: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            message_magic: DEFAULT_MESSAGE_MAGIC,
            user_agent: format!("/nodus:{}/", env!("CARGO_PKG_VERSION")),
            unhealthy_peer_seconds: 300,
        }
    }
}

impl ProtocolConfig {
    pub fn context(&self) -> DeserializeWireContext {
        DeserializeWireContext::new(self.message_magic)
    }

    pub fn unhealthy_peer_timeout(&self) -> Duration {
        Duration::from_secs(self.unhealthy_peer_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// RocksDB directory
    pub data_dir: PathBuf,

    /// Entries kept by each table cache
    pub cache_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of pending transactions
    pub capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MEMPOOL_CAPACITY,
        }
    }
}

/// Main configuration of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub protocol: ProtocolConfig,
    pub storage: StorageConfig,
    pub mempool: MempoolConfig,
}

/// Platform data directory, falling back to the working directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("nodus")
}

impl NodeConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    // Builder-style methods for CLI overrides

    pub fn with_listen_port(mut self, port: u16) -> Self {
        let listen = self.network.listen.get_or_insert_with(ListenConfig::default);
        listen.port = port;
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<Endpoint>) -> Self {
        for seed in seeds {
            if !self.network.seeds.contains(&seed) {
                self.network.seeds.push(seed);
            }
        }
        self
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.storage.data_dir = data_dir;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        self.network.validate()?;

        if self.protocol.user_agent.len() > MAX_USER_AGENT_SIZE {
            anyhow::bail!(
                "user_agent is {} bytes, at most {} allowed",
                self.protocol.user_agent.len(),
                MAX_USER_AGENT_SIZE
            );
        }

        if self.protocol.unhealthy_peer_seconds == 0 {
            anyhow::bail!("unhealthy_peer_seconds must be greater than zero");
        }

        if self.protocol.unhealthy_peer_seconds * 1000 < self.network.health_check_interval_ms {
            anyhow::bail!(
                "unhealthy_peer_seconds ({}) is shorter than one health check interval ({} ms)",
                self.protocol.unhealthy_peer_seconds,
                self.network.health_check_interval_ms
            );
        }

        if self.storage.cache_capacity == 0 {
            anyhow::bail!("storage cache_capacity must be at least 1");
        }

        if self.mempool.capacity == 0 {
            anyhow::bail!("mempool capacity must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.protocol.message_magic, DEFAULT_MESSAGE_MAGIC);
        assert_eq!(config.mempool.capacity, DEFAULT_MEMPOOL_CAPACITY);
        assert!(config.storage.data_dir.ends_with("nodus"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = NodeConfig::default();
        config.protocol.unhealthy_peer_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.protocol.user_agent = "x".repeat(MAX_USER_AGENT_SIZE + 1);
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.network.max_connected_peers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_methods() {
        let seed: Endpoint = "tcp://10.0.0.5:10333".parse().unwrap();
        let config = NodeConfig::default()
            .with_listen_port(30334)
            .with_seeds(vec![seed.clone(), seed.clone()])
            .with_data_dir(PathBuf::from("/tmp/nodus-test"));

        assert_eq!(config.network.listen.as_ref().map(|l| l.port), Some(30334));
        assert_eq!(config.network.seeds, vec![seed]);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/nodus-test"));
    }

    #[test]
    fn test_listen_port_enables_outbound_only_listener() {
        let mut config = NodeConfig::default();
        config.network.listen = None;
        let config = config.with_listen_port(1234);
        assert_eq!(config.network.listen, Some(ListenConfig { host: "0.0.0.0".to_string(), port: 1234 }));
    }

    #[test]
    fn test_toml_round_trip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nodus.toml");
        let config = NodeConfig::default()
            .with_seeds(vec!["tcp://[::1]:20333".parse().unwrap()])
            .with_listen_port(20444);

        config.save(&path).unwrap();
        assert_eq!(NodeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            [network]
            max_connected_peers = 3
            seeds = ["tcp://127.0.0.1:20333"]

            [protocol]
            message_magic = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.network.max_connected_peers, 3);
        assert_eq!(config.network.seeds.len(), 1);
        assert_eq!(config.protocol.message_magic, 42);
        assert_eq!(config.protocol.unhealthy_peer_seconds, 300);
        assert_eq!(config.mempool, MempoolConfig::default());
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let result: Result<NodeConfig, _> = toml::from_str(
            r#"
            [network]
            seeds = ["10.0.0.1:20333"]
            "#,
        );
        assert!(result.is_err());
    }
}

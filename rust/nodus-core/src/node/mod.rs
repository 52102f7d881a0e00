// Node - Orchestrateur du nœud Nodus
// Principle: Build every component once from the configuration and hand it down

pub mod bloom;
pub mod config;
pub mod protocol;

pub use bloom::PeerBloomFilter;
pub use config::{MempoolConfig, NodeConfig, ProtocolConfig, StorageConfig};
pub use protocol::{BlockProgressHealth, NodePeer, NodeProtocol, PeerData, NODE_NETWORK, PROTOCOL_VERSION};

use crate::mempool::{MemoryPool, MempoolError};
use crate::network::{Network, NetworkError, NetworkEvents};
use crate::storage::{BlockchainStorage, StorageError};
use crate::types::{BlockIndex, Transaction};
use std::sync::Arc;
use tracing::info;

/// Node errors
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage, mempool and network of one node
pub struct Node {
    config: NodeConfig,
    network: Network<NodeProtocol>,
}

impl Node {
    /// Open storage and build the stopped network; returns the peer event stream too
    pub fn open(config: NodeConfig) -> Result<(Self, NetworkEvents<NodeProtocol>), NodeError> {
        std::fs::create_dir_all(&config.storage.data_dir)?;
        let storage = Arc::new(BlockchainStorage::open(
            &config.storage.data_dir,
            config.protocol.context(),
            config.storage.cache_capacity,
        )?);
        let mempool = Arc::new(MemoryPool::new(config.mempool.capacity));

        let listen_port = config.network.listen.as_ref().map_or(0, |listen| listen.port);
        let protocol = NodeProtocol::new(config.protocol.clone(), listen_port, storage, mempool)?;
        info!("⛓️  Height {} (nonce {:#010x})", protocol.height(), protocol.nonce());

        let (network, events) = Network::new(config.network.clone(), protocol);
        Ok((Self { config, network }, events))
    }

    pub async fn start(&self) -> Result<(), NodeError> {
        self.network.start().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        self.network.stop().await;
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn network(&self) -> &Network<NodeProtocol> {
        &self.network
    }

    pub fn storage(&self) -> &Arc<BlockchainStorage> {
        self.network.protocol().storage()
    }

    pub fn mempool(&self) -> &Arc<MemoryPool> {
        self.network.protocol().mempool()
    }

    pub fn height(&self) -> BlockIndex {
        self.network.protocol().height()
    }

    /// Submit a local transaction; it is relayed once admitted
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<(), MempoolError> {
        self.network.protocol().add_transaction(&self.network, tx).await
    }
}

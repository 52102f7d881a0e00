// Node protocol - Handshake version/verack et traitement des messages
// Principle: The network manager stays generic; everything a message means lives here

use super::bloom::PeerBloomFilter;
use super::config::ProtocolConfig;
use crate::mempool::{MemoryPool, MempoolError};
use crate::network::{
    create_endpoint, get_endpoint_config, NegotiateResult, NegotiationError, Network, NetworkProtocol, Peer,
    PeerHealth, ProtocolPeer,
};
use crate::protocol::{
    AddrPayload, GetBlocksPayload, HeadersPayload, InvPayload, InventoryType, Message, MessageCodec, MessageValue,
    NetworkAddressWithTime, PingPayload, VersionPayload, MAX_ADDRESS_COUNT, MAX_HEADERS_COUNT, MAX_INVENTORY_HASHES,
};
use crate::storage::{BlockchainStorage, ReadStorage, StorageError};
use crate::types::{Block, BlockIndex, Header, Transaction, UInt256};
use crate::wire::SerializableWire;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Version spoken in the handshake; peers on another version are dropped
pub const PROTOCOL_VERSION: u32 = 0;

/// Service bit of a full node
pub const NODE_NETWORK: u64 = 1;

/// Block hashes announced in answer to one `getblocks`
pub const GET_BLOCKS_COUNT: usize = 500;

/// Progress past the last request after which the next one goes out at once
const GET_BLOCKS_BUFFER: BlockIndex = (GET_BLOCKS_COUNT / 3) as BlockIndex;

/// Minimum spacing of repeated requests from the same height
const GET_BLOCKS_RETRY: Duration = Duration::from_secs(1);

/// Requests from one height tolerated before the best peer is dropped
const GET_BLOCKS_CLOSE_COUNT: u32 = 2;

/// Lead a new peer needs over the current best peer to replace it
const BEST_PEER_SWITCH_BLOCKS: BlockIndex = 100;

fn now_seconds() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX)
}

// =============================================================================
// PEER DATA & HEALTH
// =============================================================================

/// What a peer told us in its version message
#[derive(Debug)]
pub struct PeerData {
    pub nonce: u32,
    pub start_height: BlockIndex,
    /// Port the peer listens on; 0 when it accepts no connections
    pub listen_port: u16,
    pub user_agent: String,
    block_index: AtomicU32,
    bloom_filter: Mutex<Option<PeerBloomFilter>>,
}

impl PeerData {
    pub fn new(nonce: u32, start_height: BlockIndex, listen_port: u16, user_agent: String) -> Self {
        Self {
            nonce,
            start_height,
            listen_port,
            user_agent,
            block_index: AtomicU32::new(start_height),
            bloom_filter: Mutex::new(None),
        }
    }

    fn bloom_filter(&self) -> MutexGuard<'_, Option<PeerBloomFilter>> {
        self.bloom_filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether relayed transaction `tx` is of interest; true without a filter
    pub fn wants_transaction(&self, tx: &Transaction) -> bool {
        self.bloom_filter().as_ref().map_or(true, |filter| filter.matches(tx))
    }

    pub fn has_bloom_filter(&self) -> bool {
        self.bloom_filter().is_some()
    }

    /// Highest block index the peer reported
    pub fn block_index(&self) -> BlockIndex {
        self.block_index.load(Ordering::Relaxed)
    }

    pub fn update_block_index(&self, index: BlockIndex) {
        self.block_index.fetch_max(index, Ordering::Relaxed);
    }
}

/// Health derived from block progress: a peer stuck on one height for too long is unhealthy
#[derive(Debug, Clone, Copy)]
pub struct BlockProgressHealth {
    healthy: bool,
    block_index: BlockIndex,
    /// When `block_index` was first seen
    since: Instant,
}

impl BlockProgressHealth {
    pub fn block_index(&self) -> BlockIndex {
        self.block_index
    }
}

impl PeerHealth for BlockProgressHealth {
    fn healthy(&self) -> bool {
        self.healthy
    }
}

// =============================================================================
// BLOCK SYNC
// =============================================================================

pub type NodePeer = ProtocolPeer<NodeProtocol>;

/// Peer we download blocks from, and the requests already sent to it
#[derive(Default)]
struct BlockSync {
    best_peer: Option<Arc<NodePeer>>,
    /// Our height when the last `getblocks` went out
    request_index: Option<BlockIndex>,
    request_count: u32,
    requested_at: Option<Instant>,
}

impl BlockSync {
    fn reset_requests(&mut self) {
        self.request_index = None;
        self.request_count = 0;
        self.requested_at = None;
    }

    fn should_request(&self, height: BlockIndex, now: Instant) -> bool {
        match (self.request_index, self.requested_at) {
            (Some(index), Some(at)) => {
                height.saturating_sub(index) > GET_BLOCKS_BUFFER || now.duration_since(at) > GET_BLOCKS_RETRY
            }
            _ => true,
        }
    }
}

/// Connected peer reporting the highest block index, other than `except`
fn find_best_peer(network: &Network<NodeProtocol>, except: Option<&NodePeer>) -> Option<Arc<NodePeer>> {
    network
        .connected_peers()
        .into_iter()
        .filter(|peer| except.map_or(true, |except| peer.endpoint() != except.endpoint()))
        .max_by_key(|peer| peer.data().block_index())
}

// =============================================================================
// NODE PROTOCOL
// =============================================================================

/// Wire protocol of a node: handshake, gossip, mempool admission and block intake
pub struct NodeProtocol {
    config: ProtocolConfig,
    nonce: u32,
    listen_port: u16,
    storage: Arc<BlockchainStorage>,
    mempool: Arc<MemoryPool>,
    height: AtomicU32,
    sync: Mutex<BlockSync>,
}

impl NodeProtocol {
    /// Starts at the persisted tip; `listen_port` is advertised to peers (0 for none)
    pub fn new(
        config: ProtocolConfig,
        listen_port: u16,
        storage: Arc<BlockchainStorage>,
        mempool: Arc<MemoryPool>,
    ) -> Result<Self, StorageError> {
        let height = storage.tip()?.unwrap_or(0);
        Ok(Self {
            config,
            nonce: rand::random(),
            listen_port,
            storage,
            mempool,
            height: AtomicU32::new(height),
            sync: Mutex::new(BlockSync::default()),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    /// Random identity sent in our version message
    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Highest block index we hold
    pub fn height(&self) -> BlockIndex {
        self.height.load(Ordering::SeqCst)
    }

    fn sync(&self) -> MutexGuard<'_, BlockSync> {
        self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Endpoint blocks are currently downloaded from
    pub fn best_peer(&self) -> Option<Arc<NodePeer>> {
        self.sync().best_peer.clone()
    }

    pub fn storage(&self) -> &Arc<BlockchainStorage> {
        &self.storage
    }

    pub fn mempool(&self) -> &Arc<MemoryPool> {
        &self.mempool
    }

    pub fn message(&self, value: MessageValue) -> Message {
        Message::new(self.config.message_magic, value)
    }

    pub fn encode(&self, value: MessageValue) -> Bytes {
        Bytes::from(self.message(value).serialize_wire())
    }

    fn version_payload(&self) -> VersionPayload {
        VersionPayload {
            protocol_version: PROTOCOL_VERSION,
            services: NODE_NETWORK,
            timestamp: now_seconds(),
            port: self.listen_port,
            nonce: self.nonce,
            user_agent: self.config.user_agent.clone(),
            start_height: self.height(),
            relay: true,
        }
    }

    fn ping_payload(&self, nonce: u32) -> PingPayload {
        PingPayload {
            last_block_index: self.height(),
            timestamp: now_seconds(),
            nonce,
        }
    }

    fn send(&self, peer: &NodePeer, value: MessageValue) {
        let command = value.command();
        if let Err(e) = peer.write_message(&self.message(value)) {
            debug!("Failed to send {} to {}: {}", command, peer.endpoint(), e);
        }
    }

    /// Admit a transaction into the mempool and announce it on success
    pub async fn add_transaction(&self, network: &Network<Self>, tx: Transaction) -> Result<(), MempoolError> {
        let hash = tx.hash();
        if self.storage.transactions().try_get(&hash).await?.is_some() {
            return Err(MempoolError::AlreadyExists(hash));
        }
        let announcement = self.encode(MessageValue::Inv(InvPayload {
            inventory_type: InventoryType::Transaction,
            hashes: vec![hash],
        }));
        self.mempool.try_add(tx.clone(), self.storage.as_ref()).await?;
        self.relay_transaction(network, &tx, announcement);
        Ok(())
    }

    /// Announce to relay peers whose bloom filter, if any, matches `tx`
    fn relay_transaction(&self, network: &Network<Self>, tx: &Transaction, announcement: Bytes) {
        for peer in network.connected_peers() {
            if !peer.relay() || !peer.data().wants_transaction(tx) {
                continue;
            }
            if let Err(e) = peer.write(announcement.clone()) {
                debug!("Relay to {} failed: {}", peer.endpoint(), e);
            }
        }
    }

    /// Persist a block, release its transactions from the mempool and advance our height
    pub async fn add_block(&self, block: &Block) -> Result<bool, StorageError> {
        if self.storage.blocks().try_get(&block.hash()).await?.is_some() {
            return Ok(false);
        }
        self.storage.persist_block(block).await?;
        if let Err(e) = self.mempool.remove_block_transactions(block).await {
            warn!("⚠️ Mempool out of sync after block #{}: {}", block.index(), e);
        }

        let previous = self.height.fetch_max(block.index(), Ordering::SeqCst);
        if block.index() > previous {
            info!("📦 Block #{} {}", block.index(), block.hash());
        }
        Ok(true)
    }

    /// Addresses of connected peers that accept connections
    fn known_addresses(&self, network: &Network<Self>) -> AddrPayload {
        let now = now_seconds();
        let addresses = network
            .connected_peers()
            .iter()
            .filter(|peer| peer.data().listen_port != 0)
            .filter_map(|peer| {
                let mut config = get_endpoint_config(peer.endpoint()).ok()?;
                config.port = peer.data().listen_port;
                NetworkAddressWithTime::from_endpoint(now, NODE_NETWORK, &create_endpoint(&config).ok()?)
            })
            .take(MAX_ADDRESS_COUNT)
            .collect();
        AddrPayload { addresses }
    }

    async fn has_object(&self, inventory_type: InventoryType, hash: &UInt256) -> Result<bool, StorageError> {
        Ok(match inventory_type {
            InventoryType::Transaction => {
                self.mempool.contains(hash).await || self.storage.transactions().try_get(hash).await?.is_some()
            }
            InventoryType::Block => self.storage.blocks().try_get(hash).await?.is_some(),
            // Consensus payloads are not fetched
            InventoryType::Consensus => true,
        })
    }

    async fn find_object(&self, inventory_type: InventoryType, hash: &UInt256) -> Result<Option<MessageValue>, StorageError> {
        Ok(match inventory_type {
            InventoryType::Transaction => match self.mempool.get(hash).await {
                Some(tx) => Some(MessageValue::Transaction(tx)),
                None => self.storage.transactions().try_get(hash).await?.map(MessageValue::Transaction),
            },
            InventoryType::Block => self.storage.blocks().try_get(hash).await?.map(MessageValue::Block),
            InventoryType::Consensus => None,
        })
    }

    async fn on_inventory(&self, peer: &NodePeer, inventory: InvPayload) -> Result<(), StorageError> {
        let mut missing = Vec::new();
        for hash in inventory.hashes {
            if !self.has_object(inventory.inventory_type, &hash).await? {
                missing.push(hash);
            }
        }
        if !missing.is_empty() {
            self.send(
                peer,
                MessageValue::GetData(InvPayload {
                    inventory_type: inventory.inventory_type,
                    hashes: missing,
                }),
            );
        }
        Ok(())
    }

    async fn on_get_data(&self, peer: &NodePeer, inventory: InvPayload) -> Result<(), StorageError> {
        let mut not_found = Vec::new();
        for hash in inventory.hashes {
            match self.find_object(inventory.inventory_type, &hash).await? {
                Some(MessageValue::Block(block)) => {
                    let merkle = peer.data().bloom_filter().as_ref().map(|filter| filter.merkle_block(&block));
                    match merkle {
                        Some(merkle) => self.send(peer, MessageValue::MerkleBlock(merkle)),
                        None => self.send(peer, MessageValue::Block(block)),
                    }
                }
                Some(value) => self.send(peer, value),
                None => not_found.push(hash),
            }
        }
        if !not_found.is_empty() {
            self.send(
                peer,
                MessageValue::NotFound(InvPayload {
                    inventory_type: inventory.inventory_type,
                    hashes: not_found,
                }),
            );
        }
        Ok(())
    }

    // =========================================================================
    // BLOCK SYNC
    // =========================================================================

    /// Index of the first locator hash naming a block we hold
    async fn locate(&self, locator: &[UInt256]) -> Result<Option<BlockIndex>, StorageError> {
        for hash in locator {
            if let Some(block) = self.storage.blocks().try_get(hash).await? {
                return Ok(Some(block.index()));
            }
        }
        Ok(None)
    }

    /// Hashes of the blocks after the locator, up to `hash_stop` included
    ///
    /// An empty or unknown locator starts from index 0. At most `limit`
    /// heights are scanned; heights we hold no block for are skipped.
    async fn following_block_hashes(
        &self,
        request: &GetBlocksPayload,
        limit: usize,
    ) -> Result<Vec<UInt256>, StorageError> {
        let start = match self.locate(&request.hash_start).await? {
            Some(index) => match index.checked_add(1) {
                Some(next) => next,
                None => return Ok(Vec::new()),
            },
            None => 0,
        };

        let mut hashes = Vec::new();
        for index in (start..=self.height()).take(limit) {
            if let Some(hash) = self.storage.block_hash_at(index)? {
                hashes.push(hash);
                if hash == request.hash_stop {
                    break;
                }
            }
        }
        Ok(hashes)
    }

    async fn on_get_blocks(&self, peer: &NodePeer, request: GetBlocksPayload) -> Result<(), StorageError> {
        let hashes = self
            .following_block_hashes(&request, GET_BLOCKS_COUNT.min(MAX_INVENTORY_HASHES))
            .await?;
        if !hashes.is_empty() {
            self.send(
                peer,
                MessageValue::Inv(InvPayload {
                    inventory_type: InventoryType::Block,
                    hashes,
                }),
            );
        }
        Ok(())
    }

    async fn on_get_headers(&self, peer: &NodePeer, request: GetBlocksPayload) -> Result<(), StorageError> {
        let mut headers: Vec<Header> = Vec::new();
        for hash in self.following_block_hashes(&request, MAX_HEADERS_COUNT).await? {
            if let Some(block) = self.storage.blocks().try_get(&hash).await? {
                headers.push(block.header().clone());
            }
        }
        if !headers.is_empty() {
            self.send(peer, MessageValue::Headers(HeadersPayload { headers }));
        }
        Ok(())
    }

    /// Learn the peer's height from its headers and fetch the blocks we lack
    async fn on_headers(&self, network: &Network<Self>, peer: &Arc<NodePeer>, payload: HeadersPayload) -> Result<(), StorageError> {
        let Some(last) = payload.headers.last() else {
            return Ok(());
        };
        peer.data().update_block_index(last.index());

        let mut missing = Vec::new();
        for header in &payload.headers {
            if missing.len() == MAX_INVENTORY_HASHES {
                break;
            }
            let hash = header.hash();
            if !self.has_object(InventoryType::Block, &hash).await? {
                missing.push(hash);
            }
        }
        if !missing.is_empty() {
            self.send(
                peer,
                MessageValue::GetData(InvPayload {
                    inventory_type: InventoryType::Block,
                    hashes: missing,
                }),
            );
        }
        self.request_blocks(network);
        Ok(())
    }

    /// Ask the best peer for the blocks after our tip when it reports more
    ///
    /// A best peer that keeps being asked from the same height without
    /// delivering is blacklisted and replaced.
    pub fn request_blocks(&self, network: &Network<Self>) {
        let height = self.height();
        let now = Instant::now();
        let mut sync = self.sync();

        if sync.best_peer.as_ref().is_some_and(|best| !best.is_connected()) {
            sync.best_peer = find_best_peer(network, None);
            sync.reset_requests();
        }
        let Some(peer) = sync.best_peer.clone() else {
            return;
        };
        if peer.data().block_index() <= height {
            return;
        }

        if sync.request_count > GET_BLOCKS_CLOSE_COUNT {
            info!("🐢 Best peer {} stalled at height {}", peer.endpoint(), height);
            sync.best_peer = find_best_peer(network, Some(peer.as_ref()));
            sync.reset_requests();
            drop(sync);
            network.blacklist_and_close(&peer);
            return;
        }
        if !sync.should_request(height, now) {
            return;
        }
        if sync.request_index == Some(height) {
            sync.request_count += 1;
        } else {
            sync.request_index = Some(height);
            sync.request_count = 1;
        }
        sync.requested_at = Some(now);
        drop(sync);

        let hash_start = match self.storage.tip_hash() {
            Ok(tip) => tip.into_iter().collect(),
            Err(e) => {
                warn!("⚠️ Cannot read our tip to request blocks: {}", e);
                return;
            }
        };
        debug!(
            "Requesting blocks after #{} from {} (height {})",
            height,
            peer.endpoint(),
            peer.data().block_index()
        );
        self.send(
            &peer,
            MessageValue::GetBlocks(GetBlocksPayload {
                hash_start,
                hash_stop: UInt256::ZERO,
            }),
        );
    }

    async fn on_mempool_request(&self, peer: &NodePeer) {
        let hashes = self.mempool.hashes().await;
        for chunk in hashes.chunks(MAX_INVENTORY_HASHES) {
            self.send(
                peer,
                MessageValue::Inv(InvPayload {
                    inventory_type: InventoryType::Transaction,
                    hashes: chunk.to_vec(),
                }),
            );
        }
    }
}

fn unexpected(expected: &str, actual: &MessageValue) -> NegotiationError {
    NegotiationError::UnexpectedMessage {
        expected: expected.to_string(),
        actual: actual.command().to_string(),
    }
}

#[async_trait]
impl NetworkProtocol for NodeProtocol {
    type Message = Message;
    type PeerData = PeerData;
    type PeerHealth = BlockProgressHealth;
    type Codec = MessageCodec;

    fn create_message_codec(&self) -> MessageCodec {
        MessageCodec::new(self.config.context())
    }

    async fn negotiate(
        &self,
        network: &Network<Self>,
        peer: &Peer<Message>,
    ) -> Result<NegotiateResult<PeerData>, NegotiationError> {
        let timeout = network.config().negotiation_timeout();
        peer.write_message(&self.message(MessageValue::Version(self.version_payload())))?;

        let version = match peer.receive_message(timeout).await?.value {
            MessageValue::Version(version) => version,
            other => return Err(unexpected("version", &other)),
        };
        if version.nonce == self.nonce {
            return Err(NegotiationError::SelfConnection);
        }
        if let Some(existing) = network
            .connected_peers()
            .into_iter()
            .find(|connected| connected.data().nonce == version.nonce)
        {
            return Err(NegotiationError::AlreadyConnected {
                existing: existing.endpoint().clone(),
            });
        }
        if version.protocol_version != PROTOCOL_VERSION {
            return Err(NegotiationError::Incompatible(format!(
                "protocol version {}, expected {}",
                version.protocol_version, PROTOCOL_VERSION
            )));
        }

        peer.write_message(&self.message(MessageValue::Verack))?;
        match peer.receive_message(timeout).await?.value {
            MessageValue::Verack => {}
            other => return Err(unexpected("verack", &other)),
        }

        debug!(
            "Negotiated with {} ({}, height {})",
            peer.endpoint(),
            version.user_agent,
            version.start_height
        );
        Ok(NegotiateResult {
            relay: version.relay,
            data: PeerData::new(version.nonce, version.start_height, version.port, version.user_agent),
        })
    }

    /// Also pings the peer so its next pong refreshes the reported height
    fn check_peer_health(&self, peer: &NodePeer, previous: Option<&BlockProgressHealth>) -> BlockProgressHealth {
        self.send(peer, MessageValue::Ping(self.ping_payload(rand::random())));

        let now = Instant::now();
        let block_index = peer.data().block_index();
        match previous {
            Some(previous) if block_index <= previous.block_index => BlockProgressHealth {
                healthy: now.duration_since(previous.since) < self.config.unhealthy_peer_timeout(),
                block_index: previous.block_index,
                since: previous.since,
            },
            _ => BlockProgressHealth {
                healthy: true,
                block_index,
                since: now,
            },
        }
    }

    async fn on_message_received(&self, network: &Network<Self>, peer: &Arc<NodePeer>, message: Message) {
        let command = message.command();
        let result = match message.value {
            MessageValue::Ping(ping) => {
                peer.data().update_block_index(ping.last_block_index);
                self.send(peer, MessageValue::Pong(self.ping_payload(ping.nonce)));
                self.request_blocks(network);
                Ok(())
            }
            MessageValue::Pong(pong) => {
                peer.data().update_block_index(pong.last_block_index);
                self.request_blocks(network);
                Ok(())
            }
            MessageValue::GetAddr => {
                self.send(peer, MessageValue::Addr(self.known_addresses(network)));
                Ok(())
            }
            MessageValue::Addr(addr) => {
                for address in addr.addresses {
                    network.add_endpoint(address.endpoint());
                }
                Ok(())
            }
            MessageValue::GetBlocks(request) => self.on_get_blocks(peer, request).await,
            MessageValue::GetHeaders(request) => self.on_get_headers(peer, request).await,
            MessageValue::Headers(headers) => self.on_headers(network, peer, headers).await,
            MessageValue::Inv(inventory) => self.on_inventory(peer, inventory).await,
            MessageValue::GetData(inventory) => self.on_get_data(peer, inventory).await,
            MessageValue::Mempool => {
                self.on_mempool_request(peer).await;
                Ok(())
            }
            MessageValue::Transaction(tx) => {
                let hash = tx.hash();
                match self.add_transaction(network, tx).await {
                    Ok(()) => debug!("Accepted tx {} from {}", hash, peer.endpoint()),
                    Err(MempoolError::AlreadyExists(_)) => {}
                    Err(e) => debug!("Rejected tx {} from {}: {}", hash, peer.endpoint(), e),
                }
                Ok(())
            }
            MessageValue::Block(block) => {
                peer.data().update_block_index(block.index());
                let added = self.add_block(&block).await.map(|_| ());
                self.request_blocks(network);
                added
            }
            MessageValue::FilterLoad(load) => {
                *peer.data().bloom_filter() = Some(PeerBloomFilter::from(load));
                Ok(())
            }
            MessageValue::FilterAdd(add) => {
                if let Some(filter) = peer.data().bloom_filter().as_mut() {
                    filter.insert(&add.data);
                }
                Ok(())
            }
            MessageValue::FilterClear => {
                *peer.data().bloom_filter() = None;
                Ok(())
            }
            // Handshake messages are only meaningful during negotiation; the
            // rest carry nothing a full node acts on
            other => {
                debug!("Ignoring {} from {}", other.command(), peer.endpoint());
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("⚠️ Failed to handle {} from {}: {}", command, peer.endpoint(), e);
        }
    }

    /// Switch to `peer` for block downloads when it leads the current best peer by enough
    fn on_peer_connected(&self, network: &Network<Self>, peer: &Arc<NodePeer>) {
        {
            let mut sync = self.sync();
            let switch = match &sync.best_peer {
                None => true,
                Some(best) => {
                    !best.is_connected()
                        || best.data().block_index().saturating_add(BEST_PEER_SWITCH_BLOCKS) < peer.data().block_index()
                }
            };
            if !switch || !peer.is_connected() {
                return;
            }
            sync.best_peer = Some(Arc::clone(peer));
            sync.reset_requests();
        }
        self.request_blocks(network);
    }

    fn on_peer_closed(&self, network: &Network<Self>, peer: &Arc<NodePeer>) {
        {
            let mut sync = self.sync();
            if !sync.best_peer.as_ref().is_some_and(|best| Arc::ptr_eq(best, peer)) {
                return;
            }
            sync.best_peer = find_best_peer(network, Some(peer.as_ref()));
            sync.reset_requests();
        }
        self.request_blocks(network);
    }

    fn on_request_endpoints(&self, network: &Network<Self>) {
        let bytes = self.encode(MessageValue::GetAddr);
        for peer in network.connected_peers() {
            if let Err(e) = peer.write(bytes.clone()) {
                debug!("Failed to request addresses from {}: {}", peer.endpoint(), e);
            }
        }
    }
}

// Network - Gestionnaire des connexions pair-à-pair
// Principle: One lock guards all peer bookkeeping; events are sent under it so
// their order matches the order of the state changes they describe

use super::config::NetworkConfig;
use super::connected::ConnectedPeer;
use super::endpoint::Endpoint;
use super::error::{NegotiationError, NetworkError, PeerError};
use super::events::NetworkEvent;
use super::peer::{Peer, PeerExit};
use super::protocol::{NetworkProtocol, PeerHealth, ProtocolPeer};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Event channel type of a protocol
pub type NetworkEvents<P> =
    mpsc::UnboundedReceiver<NetworkEvent<<P as NetworkProtocol>::Message, <P as NetworkProtocol>::PeerData>>;

// =============================================================================
// STATE
// =============================================================================

struct State<P: NetworkProtocol> {
    /// Negotiated peers
    connected: HashMap<Endpoint, Arc<ProtocolPeer<P>>>,

    /// Endpoints with a dial or handshake in flight
    connecting: HashSet<Endpoint>,

    /// Known dial candidates with their insertion order
    unconnected: HashMap<Endpoint, u64>,
    next_sequence: u64,

    /// Failed dials, out of rotation until the instant or until candidates run short
    bad_endpoints: HashMap<Endpoint, Instant>,

    /// Evicted or misbehaving endpoints, out of rotation until the instant
    penalized: HashMap<Endpoint, Instant>,

    /// Duplicate connections to a node we already reach through another endpoint
    endpoint_blacklist: HashSet<Endpoint>,

    /// Existing endpoint -> duplicate endpoint blacklisted because of it
    reverse_blacklist: HashMap<Endpoint, Endpoint>,

    /// Never dialed or accepted again
    permanent_blacklist: HashSet<Endpoint>,

    previous_health: HashMap<Endpoint, P::PeerHealth>,

    local_addr: Option<SocketAddr>,
}

impl<P: NetworkProtocol> State<P> {
    fn new() -> Self {
        Self {
            connected: HashMap::new(),
            connecting: HashSet::new(),
            unconnected: HashMap::new(),
            next_sequence: 0,
            bad_endpoints: HashMap::new(),
            penalized: HashMap::new(),
            endpoint_blacklist: HashSet::new(),
            reverse_blacklist: HashMap::new(),
            permanent_blacklist: HashSet::new(),
            previous_health: HashMap::new(),
            local_addr: None,
        }
    }

    fn is_bad(&self, endpoint: &Endpoint, now: Instant) -> bool {
        let active = |until: &Instant| *until > now;
        self.bad_endpoints.get(endpoint).is_some_and(active) || self.penalized.get(endpoint).is_some_and(active)
    }

    fn is_busy(&self, endpoint: &Endpoint) -> bool {
        self.connecting.contains(endpoint) || self.connected.contains_key(endpoint)
    }

    /// Regular dial candidate check
    fn filter_endpoint(&self, endpoint: &Endpoint, now: Instant) -> bool {
        !(self.endpoint_blacklist.contains(endpoint)
            || self.permanent_blacklist.contains(endpoint)
            || self.is_bad(endpoint, now)
            || self.is_busy(endpoint))
    }
}

struct Running {
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

struct Inner<P: NetworkProtocol> {
    config: NetworkConfig,
    protocol: P,
    seeds: HashSet<Endpoint>,
    peer_seeds: HashSet<Endpoint>,
    external_endpoints: HashSet<Endpoint>,
    state: Mutex<State<P>>,
    events: mpsc::UnboundedSender<NetworkEvent<P::Message, P::PeerData>>,
    running: tokio::sync::Mutex<Option<Running>>,
}

// =============================================================================
// NETWORK
// =============================================================================

/// Peer connection manager
///
/// Cheap to clone; all clones drive the same set of peers.
pub struct Network<P: NetworkProtocol> {
    inner: Arc<Inner<P>>,
}

impl<P: NetworkProtocol> Clone for Network<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: NetworkProtocol> Network<P> {
    /// Create a stopped network and the receiver of its lifecycle events
    pub fn new(config: NetworkConfig, protocol: P) -> (Self, NetworkEvents<P>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            seeds: config.seeds.iter().cloned().collect(),
            peer_seeds: config.peer_seeds.iter().cloned().collect(),
            external_endpoints: config.external_endpoints.iter().cloned().collect(),
            config,
            protocol,
            state: Mutex::new(State::new()),
            events,
            running: tokio::sync::Mutex::new(None),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            events_rx,
        )
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.inner.config
    }

    pub fn protocol(&self) -> &P {
        &self.inner.protocol
    }

    fn state(&self) -> MutexGuard<'_, State<P>> {
        // Bookkeeping stays consistent even if a holder panicked mid-update
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind the listener and start the background loops; no-op when running
    pub async fn start(&self) -> Result<(), NetworkError> {
        let mut running = self.inner.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        let listener = match &self.inner.config.listen {
            Some(listen) => {
                let address = format!("{}:{}", listen.host, listen.port);
                let listener = TcpListener::bind(&address)
                    .await
                    .map_err(|source| NetworkError::Bind { address, source })?;
                let local_addr = listener.local_addr().ok();
                self.state().local_addr = local_addr;
                info!("👂 Listening on {}", local_addr.map(|a| a.to_string()).unwrap_or_default());
                Some(listener)
            }
            None => None,
        };

        for seed in self.inner.config.seeds.clone() {
            self.add_endpoint(seed);
        }

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        if let Some(listener) = listener {
            tracker.spawn(self.clone().run_accept_loop(listener, shutdown.clone(), tracker.clone()));
        }
        tracker.spawn(self.clone().run_connect_loop(shutdown.clone(), tracker.clone()));
        tracker.spawn(self.clone().run_health_loop(shutdown.clone()));

        *running = Some(Running { shutdown, tracker });
        info!("🌐 Network started");
        Ok(())
    }

    /// Close every peer and wait for all background tasks; no-op when stopped
    pub async fn stop(&self) {
        let mut running = self.inner.running.lock().await;
        let Some(Running { shutdown, tracker }) = running.take() else {
            return;
        };

        shutdown.cancel();
        tracker.close();
        tracker.wait().await;

        {
            let mut state = self.state();
            state.connecting.clear();
            state.local_addr = None;
        }
        info!("🛑 Network stopped");
    }

    /// Bound listener address, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state().local_addr
    }

    /// Add a dial candidate
    pub fn add_endpoint(&self, endpoint: Endpoint) {
        if self.inner.external_endpoints.contains(&endpoint) {
            return;
        }
        let mut state = self.state();
        if state.connected.contains_key(&endpoint) || state.unconnected.contains_key(&endpoint) {
            return;
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.unconnected.insert(endpoint, sequence);
    }

    /// Known dial candidates, oldest first
    pub fn unconnected_endpoints(&self) -> Vec<Endpoint> {
        let state = self.state();
        let mut endpoints: Vec<(&Endpoint, &u64)> = state.unconnected.iter().collect();
        endpoints.sort_by_key(|(_, sequence)| **sequence);
        endpoints.into_iter().map(|(endpoint, _)| endpoint.clone()).collect()
    }

    /// Snapshot of negotiated peers
    pub fn connected_peers(&self) -> Vec<Arc<ProtocolPeer<P>>> {
        self.state().connected.values().cloned().collect()
    }

    /// Broadcast encoded bytes to every peer that asked for relay
    pub fn relay(&self, bytes: Bytes) {
        for peer in self.connected_peers() {
            if !peer.relay() {
                continue;
            }
            if let Err(e) = peer.write(bytes.clone()) {
                debug!("Relay to {} failed: {}", peer.endpoint(), e);
            }
        }
    }

    /// Close a peer and keep its endpoint out of rotation for the full cooldown
    ///
    /// Unlike failed dials, the penalty survives the connect loop running short
    /// of candidates.
    pub fn blacklist_and_close(&self, peer: &ProtocolPeer<P>) {
        self.penalize(peer.endpoint());
        peer.close();
    }

    /// Never dial or accept `endpoint` again
    pub fn permanently_blacklist(&self, endpoint: &Endpoint) {
        self.state().permanent_blacklist.insert(endpoint.clone());
    }

    pub fn is_permanently_blacklisted(&self, endpoint: &Endpoint) -> bool {
        self.state().permanent_blacklist.contains(endpoint)
    }

    fn penalize(&self, endpoint: &Endpoint) {
        let until = Instant::now() + self.inner.config.blacklist_cooldown();
        self.state().penalized.insert(endpoint.clone(), until);
    }

    fn emit(&self, event: NetworkEvent<P::Message, P::PeerData>) {
        // Nobody listening is fine
        let _ = self.inner.events.send(event);
    }

    // =========================================================================
    // CONNECT LOOP
    // =========================================================================

    async fn run_connect_loop(self, shutdown: CancellationToken, tracker: TaskTracker) {
        info!("🔄 Starting connect loop...");
        let mut ticker = tokio::time::interval(self.inner.config.connect_peers_delay());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.connect_to_peers(&shutdown, &tracker),
            }
        }
        info!("Stopped connect loop");
    }

    fn connect_to_peers(&self, shutdown: &CancellationToken, tracker: &TaskTracker) {
        let max_connected = self.inner.config.max_connected_peers;
        let (mut endpoints, request_endpoints) = {
            let mut state = self.state();
            let now = Instant::now();
            let connected = state.connected.len();
            state.penalized.retain(|_, until| *until > now);
            let mut endpoints = Vec::new();
            let mut request_endpoints = false;

            if connected < max_connected {
                let count = ((max_connected - connected) * 2).max(max_connected);
                let mut candidates: Vec<(&Endpoint, &u64)> = state
                    .unconnected
                    .iter()
                    .filter(|(endpoint, _)| state.filter_endpoint(endpoint, now))
                    .collect();
                candidates.sort_by_key(|(_, sequence)| **sequence);
                endpoints.extend(candidates.into_iter().take(count).map(|(e, _)| e.clone()));

                if endpoints.len() + connected < max_connected {
                    state.bad_endpoints.clear();
                    request_endpoints = true;
                }
            }
            (endpoints, request_endpoints)
        };

        if request_endpoints {
            self.inner.protocol.on_request_endpoints(self);
        }

        endpoints.extend(self.inner.peer_seeds.iter().cloned());
        for endpoint in endpoints {
            if self.begin_connecting(&endpoint) {
                tracker.spawn(self.clone().dial(endpoint, shutdown.clone(), tracker.clone()));
            }
        }
    }

    /// Claim `endpoint` for a new transport unless it must be skipped
    fn begin_connecting(&self, endpoint: &Endpoint) -> bool {
        let mut state = self.state();
        let allowed = if self.inner.peer_seeds.contains(endpoint) {
            !(state.endpoint_blacklist.contains(endpoint)
                || state.permanent_blacklist.contains(endpoint)
                || state.is_busy(endpoint))
        } else {
            state.filter_endpoint(endpoint, Instant::now())
        };
        if allowed {
            state.connecting.insert(endpoint.clone());
        }
        allowed
    }

    async fn dial(self, endpoint: Endpoint, shutdown: CancellationToken, tracker: TaskTracker) {
        debug!("Connecting to peer at {}", endpoint);
        let connect = async {
            let address = endpoint
                .dial_address()
                .map_err(|_| PeerError::UnsupportedEndpoint(endpoint.clone()))?;
            match tokio::time::timeout(self.inner.config.connect_timeout(), TcpStream::connect(address)).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => Err(PeerError::Connect {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                }),
                Err(_) => Err(PeerError::Connect {
                    endpoint: endpoint.clone(),
                    reason: "timed out".to_string(),
                }),
            }
        };

        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                self.state().connecting.remove(&endpoint);
                return;
            }
            result = connect => result,
        };

        match result {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                self.start_peer(endpoint, stream, shutdown, tracker).await;
            }
            Err(e) => {
                debug!("Failed to connect to peer at {}: {}", endpoint, e);
                let until = Instant::now() + self.inner.config.blacklist_cooldown();
                let mut state = self.state();
                state.connecting.remove(&endpoint);
                if !self.inner.seeds.contains(&endpoint) {
                    state.unconnected.remove(&endpoint);
                }
                state.bad_endpoints.insert(endpoint, until);
            }
        }
    }

    // =========================================================================
    // ACCEPT LOOP
    // =========================================================================

    async fn run_accept_loop(self, listener: TcpListener, shutdown: CancellationToken, tracker: TaskTracker) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, address)) => {
                    let endpoint = Endpoint::from_socket_addr(&address);
                    debug!("Received socket connection from {}", endpoint);
                    if !self.begin_connecting(&endpoint) {
                        debug!("Rejecting connection from {}", endpoint);
                        continue;
                    }
                    let _ = stream.set_nodelay(true);
                    tracker.spawn(self.clone().start_peer(endpoint, stream, shutdown.clone(), tracker.clone()));
                }
                Err(e) => warn!("⚠️ TCP listener error: {}", e),
            }
        }
        debug!("TCP listener closed");
    }

    // =========================================================================
    // PEER SESSION
    // =========================================================================

    /// Drive one transport: spawn its driver, negotiate, then dispatch messages
    ///
    /// `endpoint` must have been claimed with `begin_connecting`.
    pub(crate) async fn start_peer<S>(
        self,
        endpoint: Endpoint,
        stream: S,
        shutdown: CancellationToken,
        tracker: TaskTracker,
    ) where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (peer, driver) = Peer::open(
            endpoint.clone(),
            stream,
            self.inner.protocol.create_message_codec(),
            self.inner.config.socket_timeout(),
            shutdown.child_token(),
        );

        let network = self.clone();
        let exited = Arc::clone(&peer);
        tracker.spawn(async move {
            let exit = driver.await;
            network.on_peer_exit(&exited, exit);
        });

        let negotiated = tokio::select! {
            _ = shutdown.cancelled() => Err(NegotiationError::Cancelled),
            result = tokio::time::timeout(
                self.inner.config.negotiation_timeout(),
                self.inner.protocol.negotiate(&self, &peer),
            ) => result.unwrap_or(Err(NegotiationError::Timeout)),
        };

        let result = match negotiated {
            Ok(result) => result,
            Err(e) => {
                debug!("Negotiation with {} failed: {}", endpoint, e);
                {
                    let mut state = self.state();
                    state.connecting.remove(&endpoint);
                    match &e {
                        NegotiationError::SelfConnection => {
                            state.permanent_blacklist.insert(endpoint.clone());
                        }
                        NegotiationError::AlreadyConnected { existing } => {
                            state.endpoint_blacklist.insert(endpoint.clone());
                            state.reverse_blacklist.insert(existing.clone(), endpoint.clone());
                        }
                        _ => {}
                    }
                }
                peer.close();
                return;
            }
        };

        let connected_peer = Arc::new(ConnectedPeer::new(Arc::clone(&peer), result.data, result.relay));
        {
            let mut state = self.state();
            state.connecting.remove(&endpoint);
            // The driver clears the flag before reporting its exit under this lock
            if !peer.is_connected() {
                return;
            }
            state.connected.insert(endpoint.clone(), Arc::clone(&connected_peer));
            self.emit(NetworkEvent::PeerConnectSuccess {
                connected_peer: Arc::clone(&connected_peer),
            });
        }
        info!("🤝 Connected to peer {}", endpoint);
        self.inner.protocol.on_peer_connected(&self, &connected_peer);

        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                message = peer.next_message() => message,
            };
            match message {
                Some(message) => {
                    self.inner
                        .protocol
                        .on_message_received(&self, &connected_peer, message)
                        .await
                }
                None => break,
            }
        }
    }

    fn on_peer_exit(&self, peer: &Peer<P::Message>, exit: PeerExit) {
        let endpoint = peer.endpoint();
        let mut state = self.state();

        let connected_peer = match state.connected.get(endpoint) {
            Some(existing) if existing.peer().id() == peer.id() => state.connected.remove(endpoint),
            _ => None,
        };
        if connected_peer.is_some() {
            state.previous_health.remove(endpoint);
            if let Some(duplicate) = state.reverse_blacklist.remove(endpoint) {
                state.endpoint_blacklist.remove(&duplicate);
            }
        }
        if let PeerExit::Malformed(e) = &exit {
            warn!("⚠️ Malformed message from {}: {}", endpoint, e);
            let until = Instant::now() + self.inner.config.blacklist_cooldown();
            state.penalized.insert(endpoint.clone(), until);
        }

        self.emit(NetworkEvent::PeerClosed {
            endpoint: endpoint.clone(),
            connected_peer: connected_peer.clone(),
        });
        drop(state);
        debug!("Peer closed at {}: {}", endpoint, exit);
        if let Some(connected_peer) = connected_peer {
            self.inner.protocol.on_peer_closed(self, &connected_peer);
        }
    }

    // =========================================================================
    // HEALTH CHECK
    // =========================================================================

    async fn run_health_loop(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.inner.config.health_check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.check_peer_health(),
            }
        }
    }

    /// One health sweep over every negotiated peer
    pub fn check_peer_health(&self) {
        for peer in self.connected_peers() {
            let previous = self.state().previous_health.remove(peer.endpoint());
            let health = self.inner.protocol.check_peer_health(&peer, previous.as_ref());

            if health.healthy() {
                let mut state = self.state();
                // Skip peers that closed while their health was computed
                if state.connected.contains_key(peer.endpoint()) {
                    state.previous_health.insert(peer.endpoint().clone(), health);
                }
            } else {
                info!("💔 Peer at {} is unhealthy", peer.endpoint());
                self.blacklist_and_close(&peer);
            }
        }
    }
}

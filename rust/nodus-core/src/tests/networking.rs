// Networking Integration Tests
// Connection manager lifecycle over loopback TCP with a minimal protocol

#[cfg(test)]
mod tests {
    use crate::network::{
        Endpoint, ListenConfig, NegotiateResult, NegotiationError, Network, NetworkConfig, NetworkEvent,
        NetworkEvents, NetworkProtocol, Peer, PeerHealth, ProtocolPeer,
    };
    use crate::protocol::{Command, Message, MessageCodec, MessageValue};
    use crate::wire::{DeserializeWireContext, SerializableWire};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const MAGIC: u32 = 0x6e6f6475;
    const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

    // =========================================================================
    // STUB PROTOCOL
    // =========================================================================

    /// Handshake-free protocol with a fixed health verdict
    struct StubProtocol {
        healthy: bool,
        /// Dialed endpoints negotiated with `relay == true`
        relay_to: Vec<Endpoint>,
        /// Never finish a handshake
        stall_negotiation: bool,
        /// Every message handed to the protocol after negotiation
        received: Option<mpsc::UnboundedSender<Message>>,
    }

    impl StubProtocol {
        fn healthy() -> Self {
            Self {
                healthy: true,
                relay_to: Vec::new(),
                stall_negotiation: false,
                received: None,
            }
        }

        fn unhealthy() -> Self {
            Self {
                healthy: false,
                ..Self::healthy()
            }
        }

        fn recording() -> (Self, mpsc::UnboundedReceiver<Message>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Self {
                    received: Some(tx),
                    ..Self::healthy()
                },
                rx,
            )
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct StubHealth(bool);

    impl PeerHealth for StubHealth {
        fn healthy(&self) -> bool {
            self.0
        }
    }

    #[async_trait]
    impl NetworkProtocol for StubProtocol {
        type Message = Message;
        type PeerData = ();
        type PeerHealth = StubHealth;
        type Codec = MessageCodec;

        fn create_message_codec(&self) -> MessageCodec {
            MessageCodec::new(DeserializeWireContext::new(MAGIC))
        }

        async fn negotiate(
            &self,
            _network: &Network<Self>,
            peer: &Peer<Message>,
        ) -> Result<NegotiateResult<()>, NegotiationError> {
            if self.stall_negotiation {
                return std::future::pending().await;
            }
            Ok(NegotiateResult {
                data: (),
                relay: self.relay_to.contains(peer.endpoint()),
            })
        }

        fn check_peer_health(&self, _peer: &ProtocolPeer<Self>, _previous: Option<&StubHealth>) -> StubHealth {
            StubHealth(self.healthy)
        }

        async fn on_message_received(&self, _network: &Network<Self>, _peer: &Arc<ProtocolPeer<Self>>, message: Message) {
            if let Some(received) = &self.received {
                let _ = received.send(message);
            }
        }

        fn on_request_endpoints(&self, _network: &Network<Self>) {}
    }

    // =========================================================================
    // HELPER FUNCTIONS
    // =========================================================================

    fn listening_config() -> NetworkConfig {
        NetworkConfig {
            listen: Some(ListenConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            }),
            ..NetworkConfig::default()
        }
    }

    fn dialing_config(seeds: Vec<Endpoint>) -> NetworkConfig {
        NetworkConfig {
            listen: None,
            seeds,
            connect_peers_delay_ms: 50,
            ..NetworkConfig::default()
        }
    }

    async fn start_listener(healthy: bool) -> (Network<StubProtocol>, NetworkEvents<StubProtocol>, Endpoint) {
        let protocol = if healthy { StubProtocol::healthy() } else { StubProtocol::unhealthy() };
        start_listener_with(protocol).await
    }

    async fn start_listener_with(
        protocol: StubProtocol,
    ) -> (Network<StubProtocol>, NetworkEvents<StubProtocol>, Endpoint) {
        let (network, events) = Network::new(listening_config(), protocol);
        network.start().await.unwrap();
        let addr = network.local_addr().unwrap();
        (network, events, Endpoint::from_socket_addr(&addr))
    }

    async fn next_event(events: &mut NetworkEvents<StubProtocol>) -> NetworkEvent<Message, ()> {
        tokio::time::timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for a network event")
            .expect("event channel closed")
    }

    async fn expect_connected(events: &mut NetworkEvents<StubProtocol>) -> Arc<ProtocolPeer<StubProtocol>> {
        match next_event(events).await {
            NetworkEvent::PeerConnectSuccess { connected_peer } => connected_peer,
            other => panic!("expected PeerConnectSuccess, got {:?}", other),
        }
    }

    /// Nothing arrives on `rx` for `window`
    async fn stays_silent<T>(rx: &mut mpsc::UnboundedReceiver<T>, window: Duration) -> bool {
        tokio::time::timeout(window, rx.recv()).await.is_err()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_dial_and_accept() {
        let (server, mut server_events, endpoint) = start_listener(true).await;
        let (client, mut client_events) = Network::new(dialing_config(vec![endpoint.clone()]), StubProtocol::healthy());
        client.start().await.unwrap();

        match next_event(&mut client_events).await {
            NetworkEvent::PeerConnectSuccess { connected_peer } => assert_eq!(connected_peer.endpoint(), &endpoint),
            other => panic!("expected PeerConnectSuccess, got {:?}", other),
        }
        assert!(matches!(
            next_event(&mut server_events).await,
            NetworkEvent::PeerConnectSuccess { .. }
        ));
        assert_eq!(client.connected_peers().len(), 1);
        assert_eq!(server.connected_peers().len(), 1);

        client.stop().await;
        match next_event(&mut client_events).await {
            NetworkEvent::PeerClosed { endpoint: closed, connected_peer } => {
                assert_eq!(closed, endpoint);
                assert!(connected_peer.is_some());
            }
            other => panic!("expected PeerClosed, got {:?}", other),
        }
        assert!(client.connected_peers().is_empty());
        server.stop().await;
    }

    #[tokio::test]
    async fn test_unhealthy_peer_evicted_once() {
        let (server, _server_events, endpoint) = start_listener(true).await;

        // One dial at startup, then sweeps every 100 ms
        let config = NetworkConfig {
            connect_peers_delay_ms: 3_600_000,
            health_check_interval_ms: 100,
            ..dialing_config(vec![endpoint.clone()])
        };
        let (client, mut events) = Network::new(config, StubProtocol::unhealthy());
        client.start().await.unwrap();

        let connected = match next_event(&mut events).await {
            NetworkEvent::PeerConnectSuccess { connected_peer } => connected_peer,
            other => panic!("expected PeerConnectSuccess, got {:?}", other),
        };

        match next_event(&mut events).await {
            NetworkEvent::PeerClosed { endpoint: closed, connected_peer } => {
                assert_eq!(closed, endpoint);
                let evicted = connected_peer.expect("evicted peer had been negotiated");
                assert!(Arc::ptr_eq(&evicted, &connected));
            }
            other => panic!("expected PeerClosed, got {:?}", other),
        }
        assert!(!connected.is_connected());
        assert!(client.connected_peers().is_empty());

        // No second close for the same transport
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(events.try_recv().is_err());

        client.stop().await;
        server.stop().await;
    }

    #[tokio::test]
    async fn test_healthy_peer_kept() {
        let (server, _server_events, endpoint) = start_listener(true).await;
        let config = NetworkConfig {
            health_check_interval_ms: 50,
            ..dialing_config(vec![endpoint])
        };
        let (client, mut events) = Network::new(config, StubProtocol::healthy());
        client.start().await.unwrap();

        assert!(matches!(next_event(&mut events).await, NetworkEvent::PeerConnectSuccess { .. }));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(client.connected_peers().len(), 1);

        client.stop().await;
        server.stop().await;
    }

    // =========================================================================
    // BLACKLISTS
    // =========================================================================

    #[tokio::test]
    async fn test_permanently_blacklisted_endpoint_never_dialed() {
        let (server, mut server_events, endpoint) = start_listener(true).await;
        let (client, mut client_events) = Network::new(dialing_config(vec![endpoint.clone()]), StubProtocol::healthy());
        client.permanently_blacklist(&endpoint);
        client.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        client.add_endpoint(endpoint.clone());
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(client.is_permanently_blacklisted(&endpoint));
        assert!(client.connected_peers().is_empty());
        assert!(client_events.try_recv().is_err());
        // Nothing ever reached the listener
        assert!(server_events.try_recv().is_err());
        assert!(server.connected_peers().is_empty());

        client.stop().await;
        server.stop().await;
    }

    #[tokio::test]
    async fn test_external_endpoint_not_added() {
        let external: Endpoint = "tcp://203.0.113.7:20333".parse().unwrap();
        let config = NetworkConfig {
            external_endpoints: vec![external.clone()],
            ..dialing_config(Vec::new())
        };
        let (network, _events) = Network::new(config, StubProtocol::healthy());

        network.add_endpoint(external);
        network.add_endpoint("tcp://203.0.113.8:20333".parse().unwrap());
        assert_eq!(
            network.unconnected_endpoints(),
            vec!["tcp://203.0.113.8:20333".parse::<Endpoint>().unwrap()]
        );
    }

    #[tokio::test]
    async fn test_unreachable_seed_stays_candidate() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let seed: Endpoint = format!("tcp://127.0.0.1:{}", port).parse().unwrap();
        let (network, mut events) = Network::new(dialing_config(vec![seed.clone()]), StubProtocol::healthy());
        network.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(network.unconnected_endpoints().contains(&seed));
        assert!(network.connected_peers().is_empty());
        // Failed dials never negotiated, so no lifecycle events
        assert!(events.try_recv().is_err());

        network.stop().await;
    }

    // =========================================================================
    // RELAY AND SHUTDOWN
    // =========================================================================

    #[tokio::test]
    async fn test_relay_reaches_only_relay_peers_past_failed_writes() {
        let (server_a, _events_a, endpoint_a, mut received_a) = {
            let (protocol, received) = StubProtocol::recording();
            let (network, events, endpoint) = start_listener_with(protocol).await;
            (network, events, endpoint, received)
        };
        let (server_b, _events_b, endpoint_b, mut received_b) = {
            let (protocol, received) = StubProtocol::recording();
            let (network, events, endpoint) = start_listener_with(protocol).await;
            (network, events, endpoint, received)
        };
        let (server_c, _events_c, endpoint_c, mut received_c) = {
            let (protocol, received) = StubProtocol::recording();
            let (network, events, endpoint) = start_listener_with(protocol).await;
            (network, events, endpoint, received)
        };

        // `b` declined relay; `c` accepted it but its transport is about to go
        let protocol = StubProtocol {
            relay_to: vec![endpoint_a.clone(), endpoint_c.clone()],
            ..StubProtocol::healthy()
        };
        let seeds = vec![endpoint_a.clone(), endpoint_b.clone(), endpoint_c.clone()];
        let (client, mut events) = Network::new(dialing_config(seeds), protocol);
        client.start().await.unwrap();
        for _ in 0..3 {
            expect_connected(&mut events).await;
        }

        let peers = client.connected_peers();
        let relays: Vec<_> = peers.iter().filter(|p| p.relay()).map(|p| p.endpoint().clone()).collect();
        assert_eq!(relays.len(), 2);
        assert!(!relays.contains(&endpoint_b));

        // Closed but not yet reaped: still listed, every write fails
        let doomed = peers
            .iter()
            .find(|p| p.endpoint() == &endpoint_c)
            .expect("connected to c");
        doomed.close();
        assert!(doomed.write(Bytes::from_static(b"x")).is_err());
        assert_eq!(client.connected_peers().len(), 3);

        let message = Message::new(MAGIC, MessageValue::GetAddr);
        client.relay(Bytes::from(message.serialize_wire()));

        let relayed = tokio::time::timeout(EVENT_TIMEOUT, received_a.recv())
            .await
            .expect("relay never reached a")
            .expect("recording closed");
        assert_eq!(relayed.command(), Command::GetAddr);
        assert!(stays_silent(&mut received_b, Duration::from_millis(300)).await);
        assert!(stays_silent(&mut received_c, Duration::from_millis(50)).await);

        client.stop().await;
        for server in [server_a, server_b, server_c] {
            server.stop().await;
        }
    }

    #[tokio::test]
    async fn test_stop_cancels_stalled_negotiation() {
        let (server, mut server_events, endpoint) = start_listener(true).await;
        let protocol = StubProtocol {
            stall_negotiation: true,
            ..StubProtocol::healthy()
        };
        let config = NetworkConfig {
            negotiation_timeout_ms: 3_600_000,
            socket_timeout_ms: 3_600_000,
            ..dialing_config(vec![endpoint])
        };
        let (client, mut client_events) = Network::new(config, protocol);
        client.start().await.unwrap();

        // The TCP session exists; only our side of the handshake hangs
        expect_connected(&mut server_events).await;

        tokio::time::timeout(Duration::from_secs(2), client.stop())
            .await
            .expect("stop waited on the stalled handshake");
        assert!(client.connected_peers().is_empty());

        // Never negotiated: the transport closes without ever being announced
        while let Ok(event) = client_events.try_recv() {
            match event {
                NetworkEvent::PeerClosed { connected_peer, .. } => assert!(connected_peer.is_none()),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(matches!(
            next_event(&mut server_events).await,
            NetworkEvent::PeerClosed { .. }
        ));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_blacklisted_endpoint_sits_out_cooldown() {
        let (server, _server_events, endpoint) = start_listener(true).await;
        let config = NetworkConfig {
            blacklist_cooldown_secs: 1,
            ..dialing_config(vec![endpoint.clone()])
        };
        let (client, mut events) = Network::new(config, StubProtocol::healthy());
        client.start().await.unwrap();

        let peer = expect_connected(&mut events).await;
        client.blacklist_and_close(&peer);
        assert!(matches!(next_event(&mut events).await, NetworkEvent::PeerClosed { .. }));

        // The only candidate is cooling down, and running short does not lift it
        assert!(stays_silent(&mut events, Duration::from_millis(600)).await);
        assert!(client.connected_peers().is_empty());
        assert!(client.unconnected_endpoints().contains(&endpoint));

        // Dialed again once the cooldown expires
        let again = expect_connected(&mut events).await;
        assert_eq!(again.endpoint(), &endpoint);

        client.stop().await;
        server.stop().await;
    }
}

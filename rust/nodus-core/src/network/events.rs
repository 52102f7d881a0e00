// Events - Notifications du cycle de vie des pairs
use super::connected::ConnectedPeer;
use super::endpoint::Endpoint;
use std::sync::Arc;

/// Peer lifecycle notification
///
/// A peer is in `connected_peers` before its `PeerConnectSuccess` is sent and
/// already gone from it when its `PeerClosed` is sent. Every transport yields
/// exactly one `PeerClosed`, negotiated or not.
pub enum NetworkEvent<M, D> {
    /// Negotiation succeeded
    PeerConnectSuccess { connected_peer: Arc<ConnectedPeer<M, D>> },

    /// Transport closed; `connected_peer` is set when it had been negotiated
    PeerClosed {
        endpoint: Endpoint,
        connected_peer: Option<Arc<ConnectedPeer<M, D>>>,
    },
}

impl<M, D> NetworkEvent<M, D> {
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            NetworkEvent::PeerConnectSuccess { connected_peer } => connected_peer.endpoint(),
            NetworkEvent::PeerClosed { endpoint, .. } => endpoint,
        }
    }
}

impl<M, D> std::fmt::Debug for NetworkEvent<M, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkEvent::PeerConnectSuccess { connected_peer } => f
                .debug_struct("PeerConnectSuccess")
                .field("endpoint", connected_peer.endpoint())
                .finish(),
            NetworkEvent::PeerClosed {
                endpoint,
                connected_peer,
            } => f
                .debug_struct("PeerClosed")
                .field("endpoint", endpoint)
                .field("negotiated", &connected_peer.is_some())
                .finish(),
        }
    }
}

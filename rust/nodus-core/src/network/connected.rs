// ConnectedPeer - Pair négocié: transport + données de capacité
use super::endpoint::Endpoint;
use super::error::PeerError;
use super::peer::Peer;
use crate::wire::SerializableWire;
use bytes::Bytes;
use std::sync::Arc;

/// Negotiated peer
///
/// Holds the transport rather than extending it, so `D` varies independently of
/// how bytes move.
pub struct ConnectedPeer<M, D> {
    peer: Arc<Peer<M>>,
    data: D,
    relay: bool,
}

impl<M, D> ConnectedPeer<M, D> {
    pub fn new(peer: Arc<Peer<M>>, data: D, relay: bool) -> Self {
        Self { peer, data, relay }
    }

    pub fn peer(&self) -> &Arc<Peer<M>> {
        &self.peer
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.peer.endpoint()
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_connected()
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Whether the remote asked for relayed inventory
    pub fn relay(&self) -> bool {
        self.relay
    }

    pub fn write(&self, bytes: Bytes) -> Result<(), PeerError> {
        self.peer.write(bytes)
    }

    pub fn close(&self) {
        self.peer.close()
    }
}

impl<M: SerializableWire, D> ConnectedPeer<M, D> {
    pub fn write_message(&self, message: &M) -> Result<(), PeerError> {
        self.peer.write_message(message)
    }
}

impl<M, D: std::fmt::Debug> std::fmt::Debug for ConnectedPeer<M, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedPeer")
            .field("peer", &self.peer)
            .field("data", &self.data)
            .field("relay", &self.relay)
            .finish()
    }
}

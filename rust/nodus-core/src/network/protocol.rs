// Protocol - Points d'extension du gestionnaire réseau
// Principle: The network moves bytes and tracks peers; the protocol decides what they mean

use super::connected::ConnectedPeer;
use super::error::NegotiationError;
use super::manager::Network;
use super::peer::Peer;
use crate::protocol::CodecError;
use crate::wire::SerializableWire;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::codec::Decoder;

/// Outcome of a successful handshake
#[derive(Debug, Clone)]
pub struct NegotiateResult<D> {
    pub data: D,
    pub relay: bool,
}

/// Health snapshot produced by a health policy
pub trait PeerHealth {
    fn healthy(&self) -> bool;
}

/// Connected peer type of a protocol
pub type ProtocolPeer<P> = ConnectedPeer<<P as NetworkProtocol>::Message, <P as NetworkProtocol>::PeerData>;

/// Message, peer data and stream codec of one wire protocol, checked together
#[async_trait]
pub trait NetworkProtocol: Send + Sync + Sized + 'static {
    type Message: SerializableWire + Send + Sync + 'static;
    type PeerData: Send + Sync + 'static;
    type PeerHealth: PeerHealth + Send + Sync + 'static;
    type Codec: Decoder<Item = Self::Message, Error = CodecError> + Send + 'static;

    /// Fresh codec for one transport
    fn create_message_codec(&self) -> Self::Codec;

    /// Turn a raw peer into negotiated data, or fail
    async fn negotiate(
        &self,
        network: &Network<Self>,
        peer: &Peer<Self::Message>,
    ) -> Result<NegotiateResult<Self::PeerData>, NegotiationError>;

    /// Next health snapshot from the previous one; unhealthy peers are evicted
    fn check_peer_health(
        &self,
        peer: &ProtocolPeer<Self>,
        previous: Option<&Self::PeerHealth>,
    ) -> Self::PeerHealth;

    /// Handle one message from a negotiated peer
    async fn on_message_received(
        &self,
        network: &Network<Self>,
        peer: &Arc<ProtocolPeer<Self>>,
        message: Self::Message,
    );

    /// Called when the connect loop runs short of dial candidates
    fn on_request_endpoints(&self, network: &Network<Self>);

    /// Called after `PeerConnectSuccess` is emitted for `peer`
    fn on_peer_connected(&self, _network: &Network<Self>, _peer: &Arc<ProtocolPeer<Self>>) {}

    /// Called after a negotiated peer's `PeerClosed` is emitted; it is already out of `connected_peers`
    fn on_peer_closed(&self, _network: &Network<Self>, _peer: &Arc<ProtocolPeer<Self>>) {}
}

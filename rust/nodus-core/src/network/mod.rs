// Network Layer - Connexions pair-à-pair sur TCP
// Principle: Negotiate, health-check and blacklist peers; never let one peer stall another

mod config;
mod connected;
mod endpoint;
mod error;
mod events;
mod manager;
mod peer;
mod protocol;

pub use config::{ListenConfig, NetworkConfig, MAX_CONNECTED_PEERS};
pub use connected::ConnectedPeer;
pub use endpoint::{create_endpoint, get_endpoint_config, Endpoint, EndpointConfig, TCP};
pub use error::{NegotiationError, NetworkError, PeerError};
pub use events::NetworkEvent;
pub use manager::{Network, NetworkEvents};
pub use peer::{Peer, PeerExit, INCOMING_QUEUE_CAPACITY, WRITE_QUEUE_CAPACITY};
pub use protocol::{NegotiateResult, NetworkProtocol, PeerHealth, ProtocolPeer};

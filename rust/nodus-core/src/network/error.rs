// Network errors
use super::endpoint::Endpoint;
use crate::wire::FormatError;
use thiserror::Error;

/// Failure of a single peer transport
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Peer {0} is closed")]
    Closed(Endpoint),

    #[error("Write queue to {0} is full")]
    WriteQueueFull(Endpoint),

    #[error("Timed out waiting for a message from {0}")]
    ReceiveTimeout(Endpoint),

    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: Endpoint, reason: String },

    #[error("Unsupported endpoint type: {0}")]
    UnsupportedEndpoint(Endpoint),
}

/// Handshake failure; the peer is dropped and never announced
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("Connected to ourselves")]
    SelfConnection,

    #[error("Already connected to this node at {existing}")]
    AlreadyConnected { existing: Endpoint },

    #[error("Unexpected message during handshake: expected {expected}, got {actual}")]
    UnexpectedMessage { expected: String, actual: String },

    #[error("Incompatible peer: {0}")]
    Incompatible(String),

    #[error("Negotiation timed out")]
    Timeout,

    #[error("Network is stopping")]
    Cancelled,

    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// Fatal network manager error
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to bind listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] FormatError),
}

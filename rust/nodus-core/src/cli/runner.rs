// Runner - Main node execution logic
// Principle: Orchestrate node startup, peer event logging, and graceful shutdown

use crate::network::{NetworkEvent, NetworkEvents};
use crate::node::{Node, NodeConfig, NodeError, NodeProtocol};
use crate::protocol::Message;
use crate::wire::{DeserializeWireContext, SerializableWire};
use anyhow::Context;
use tokio::signal;
use tracing::{debug, error, info};

/// Run the node until Ctrl+C
pub async fn run_node(config: NodeConfig) -> Result<(), NodeError> {
    info!("🚀 Starting Nodus node");
    info!("📁 Data path: {}", config.storage.data_dir.display());
    info!("🌐 Magic: {:#010x}", config.protocol.message_magic);

    let (node, events) = Node::open(config)?;
    let events_task = tokio::spawn(log_events(events));

    node.start().await?;
    if let Some(addr) = node.network().local_addr() {
        info!("👂 Listening on {}", addr);
    }

    info!("✅ Node running. Press Ctrl+C to stop.");
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    info!("🛑 Shutting down...");
    node.stop().await;
    events_task.abort();

    info!(
        "📊 Final state: height {}, {} pending transactions",
        node.height(),
        node.mempool().len().await
    );
    Ok(())
}

async fn log_events(mut events: NetworkEvents<NodeProtocol>) {
    while let Some(event) = events.recv().await {
        match event {
            NetworkEvent::PeerConnectSuccess { connected_peer } => {
                let data = connected_peer.data();
                info!(
                    "🤝 Peer connected: {} ({}, height {})",
                    connected_peer.endpoint(),
                    data.user_agent,
                    data.start_height
                );
            }
            NetworkEvent::PeerClosed {
                endpoint,
                connected_peer: Some(_),
            } => {
                info!("👋 Peer disconnected: {}", endpoint);
            }
            NetworkEvent::PeerClosed {
                endpoint,
                connected_peer: None,
            } => {
                debug!("Connection to {} closed before negotiation", endpoint);
            }
        }
    }
}

/// Decode one hex-encoded message and describe it
pub fn decode_message(hex_message: &str, magic: u32) -> anyhow::Result<String> {
    let trimmed = hex_message.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).context("message is not valid hex")?;

    let context = DeserializeWireContext::new(magic);
    let message = Message::deserialize_wire(&bytes, &context).context("message does not decode")?;

    Ok(format!(
        "command: {}\nsize: {} bytes\n{:#?}",
        message.command(),
        message.size(),
        message.value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MessageValue, PingPayload};

    #[test]
    fn test_decode_message() {
        let message = Message::new(5, MessageValue::Ping(PingPayload {
            last_block_index: 12,
            timestamp: 34,
            nonce: 56,
        }));
        let encoded = hex::encode(message.serialize_wire());

        let summary = decode_message(&encoded, 5).unwrap();
        assert!(summary.starts_with("command: ping\n"));
        assert!(summary.contains(&format!("size: {} bytes", message.size())));

        let prefixed = decode_message(&format!("0x{}", encoded), 5).unwrap();
        assert_eq!(prefixed, summary);
    }

    #[test]
    fn test_decode_message_wrong_magic() {
        let message = Message::new(5, MessageValue::Verack);
        let encoded = hex::encode(message.serialize_wire());
        assert!(decode_message(&encoded, 6).is_err());
    }

    #[test]
    fn test_decode_message_bad_hex() {
        assert!(decode_message("zz", 5).is_err());
    }
}

// Peer - Transport brut vers un nœud distant
// Principle: One driver task owns the socket; everything else talks to it through channels

use super::endpoint::Endpoint;
use super::error::PeerError;
use crate::protocol::CodecError;
use crate::wire::{FormatError, SerializableWire};
use bytes::Bytes;
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::trace;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded messages held for the reader before the socket stops being read
pub const INCOMING_QUEUE_CAPACITY: usize = 128;

/// Frames held for the socket before `write` reports a full queue
pub const WRITE_QUEUE_CAPACITY: usize = 1024;

/// Why a peer's driver stopped
#[derive(Debug, Error)]
pub enum PeerExit {
    #[error("closed locally")]
    Closed,

    #[error("remote closed the connection")]
    Eof,

    #[error("no message within the socket timeout")]
    IdleTimeout,

    #[error("malformed message: {0}")]
    Malformed(FormatError),

    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<CodecError> for PeerExit {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Format(e) => PeerExit::Malformed(e),
            CodecError::Io(e) => PeerExit::Io(e),
        }
    }
}

/// Live transport to a remote node, before or after negotiation
///
/// `write` only enqueues; the driver task performs the socket I/O. Both queues
/// are bounded: a full write queue fails `write` instead of growing, and a
/// full incoming queue stops the driver reading, leaving the remote to TCP
/// flow control until negotiation or the message loop catches up.
pub struct Peer<M> {
    id: u64,
    endpoint: Endpoint,
    writer: mpsc::Sender<Bytes>,
    incoming: Mutex<mpsc::Receiver<M>>,
    connected: AtomicBool,
    shutdown: CancellationToken,
}

impl<M: Send + 'static> Peer<M> {
    /// Wrap a connected stream
    ///
    /// Returns the handle plus the driver future, which must be spawned. The
    /// driver resolves once the transport is gone, whichever side ended it.
    pub fn open<S, C>(
        endpoint: Endpoint,
        stream: S,
        codec: C,
        socket_timeout: Duration,
        shutdown: CancellationToken,
    ) -> (Arc<Self>, impl Future<Output = PeerExit> + Send + 'static)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        C: Decoder<Item = M, Error = CodecError> + Send + 'static,
    {
        let (writer, mut outgoing) = mpsc::channel::<Bytes>(WRITE_QUEUE_CAPACITY);
        let (incoming_tx, incoming) = mpsc::channel(INCOMING_QUEUE_CAPACITY);

        let peer = Arc::new(Self {
            id: NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed),
            endpoint,
            writer,
            incoming: Mutex::new(incoming),
            connected: AtomicBool::new(true),
            shutdown,
        });

        let handle = Arc::clone(&peer);
        let driver = async move {
            let (read_half, mut write_half) = tokio::io::split(stream);
            let mut frames = FramedRead::new(read_half, codec);
            let idle = tokio::time::sleep(socket_timeout);
            tokio::pin!(idle);
            // Decoded but not yet accepted by the incoming queue
            let mut pending: Option<M> = None;

            let exit = loop {
                tokio::select! {
                    _ = handle.shutdown.cancelled() => break PeerExit::Closed,
                    _ = &mut idle, if pending.is_none() => break PeerExit::IdleTimeout,
                    frame = frames.next(), if pending.is_none() => match frame {
                        None => break PeerExit::Eof,
                        Some(Err(e)) => break PeerExit::from(e),
                        Some(Ok(message)) => pending = Some(message),
                    },
                    permit = incoming_tx.reserve(), if pending.is_some() => match (permit, pending.take()) {
                        (Ok(permit), Some(message)) => {
                            permit.send(message);
                            idle.as_mut().reset(Instant::now() + socket_timeout);
                        }
                        // The receiver lives as long as the peer handle we hold
                        _ => break PeerExit::Closed,
                    },
                    Some(bytes) = outgoing.recv() => {
                        if let Err(e) = write_half.write_all(&bytes).await {
                            break PeerExit::Io(e);
                        }
                    }
                }
            };

            handle.connected.store(false, Ordering::SeqCst);
            let _ = write_half.shutdown().await;
            trace!("Peer {} driver exited: {}", handle.endpoint, exit);
            exit
        };

        (peer, driver)
    }
}

impl<M> Peer<M> {
    /// Unique per transport; an endpoint may be reused by a later peer
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Live transport state, independent of negotiation
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Enqueue raw bytes for transmission
    ///
    /// Never waits: a peer that cannot keep up gets `WriteQueueFull` and the
    /// frame is dropped.
    pub fn write(&self, bytes: Bytes) -> Result<(), PeerError> {
        if !self.is_connected() {
            return Err(PeerError::Closed(self.endpoint.clone()));
        }
        self.writer.try_send(bytes).map_err(|e| match e {
            TrySendError::Full(_) => PeerError::WriteQueueFull(self.endpoint.clone()),
            TrySendError::Closed(_) => PeerError::Closed(self.endpoint.clone()),
        })
    }

    /// Close the transport; idempotent
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    /// Next decoded message, failing after `timeout`
    pub async fn receive_message(&self, timeout: Duration) -> Result<M, PeerError> {
        let mut incoming = self.incoming.lock().await;
        match tokio::time::timeout(timeout, incoming.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(PeerError::Closed(self.endpoint.clone())),
            Err(_) => Err(PeerError::ReceiveTimeout(self.endpoint.clone())),
        }
    }

    /// Next decoded message, or `None` once the transport is closed
    pub async fn next_message(&self) -> Option<M> {
        let mut incoming = self.incoming.lock().await;
        tokio::select! {
            message = incoming.recv() => message,
            _ = self.shutdown.cancelled() => None,
        }
    }

    /// Resolves when the peer is closed locally or the network stops
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }
}

impl<M: SerializableWire> Peer<M> {
    pub fn write_message(&self, message: &M) -> Result<(), PeerError> {
        self.write(Bytes::from(message.serialize_wire()))
    }
}

impl<M> std::fmt::Debug for Peer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, MessageCodec, MessageValue, PingPayload};
    use crate::wire::DeserializeWireContext;

    const MAGIC: u32 = 56753;

    fn open_pair(
        socket_timeout: Duration,
    ) -> (
        Arc<Peer<Message>>,
        tokio::task::JoinHandle<PeerExit>,
        tokio::io::DuplexStream,
    ) {
        open_pair_buffered(socket_timeout, 64 * 1024)
    }

    fn open_pair_buffered(
        socket_timeout: Duration,
        buffer: usize,
    ) -> (
        Arc<Peer<Message>>,
        tokio::task::JoinHandle<PeerExit>,
        tokio::io::DuplexStream,
    ) {
        let (local, remote) = tokio::io::duplex(buffer);
        let (peer, driver) = Peer::open(
            "tcp://127.0.0.1:1".parse().unwrap(),
            local,
            MessageCodec::new(DeserializeWireContext::new(MAGIC)),
            socket_timeout,
            CancellationToken::new(),
        );
        (peer, tokio::spawn(driver), remote)
    }

    fn ping() -> Message {
        Message::new(
            MAGIC,
            MessageValue::Ping(PingPayload {
                last_block_index: 3,
                timestamp: 4,
                nonce: 5,
            }),
        )
    }

    #[tokio::test]
    async fn test_receives_and_writes_messages() {
        use tokio::io::AsyncReadExt;

        let (peer, _driver, mut remote) = open_pair(Duration::from_secs(5));
        remote.write_all(&ping().serialize_wire()).await.unwrap();
        let received = peer.receive_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(received, ping());

        peer.write_message(&ping()).unwrap();
        let mut buffer = vec![0u8; ping().size()];
        remote.read_exact(&mut buffer).await.unwrap();
        assert_eq!(buffer, ping().serialize_wire());
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let (peer, _driver, _remote) = open_pair(Duration::from_secs(5));
        let err = peer.receive_message(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, PeerError::ReceiveTimeout(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (peer, driver, _remote) = open_pair(Duration::from_secs(5));
        peer.close();
        peer.close();
        assert!(!peer.is_connected());
        assert!(matches!(driver.await.unwrap(), PeerExit::Closed));
        assert!(peer.write(Bytes::from_static(b"x")).is_err());
    }

    #[tokio::test]
    async fn test_malformed_bytes_end_driver() {
        let (peer, driver, mut remote) = open_pair(Duration::from_secs(5));
        remote.write_all(&[0u8; 24]).await.unwrap();
        assert!(matches!(driver.await.unwrap(), PeerExit::Malformed(_)));
        assert!(!peer.is_connected());
    }

    #[tokio::test]
    async fn test_idle_peer_times_out() {
        let (_peer, driver, _remote) = open_pair(Duration::from_millis(30));
        assert!(matches!(driver.await.unwrap(), PeerExit::IdleTimeout));
    }

    #[tokio::test]
    async fn test_remote_hangup_is_eof() {
        let (_peer, driver, remote) = open_pair(Duration::from_secs(5));
        drop(remote);
        assert!(matches!(driver.await.unwrap(), PeerExit::Eof));
    }

    #[tokio::test]
    async fn test_full_write_queue_rejects_without_closing() {
        use tokio::io::AsyncReadExt;

        // The remote never reads, so the driver stalls on the first frames
        let (peer, _driver, mut remote) = open_pair_buffered(Duration::from_secs(5), 64);
        let frame = Bytes::from(ping().serialize_wire());

        let mut accepted = 0;
        let err = loop {
            match peer.write(frame.clone()) {
                Ok(()) => accepted += 1,
                Err(e) => break e,
            }
            assert!(accepted <= WRITE_QUEUE_CAPACITY + 8, "write queue never filled");
            tokio::task::yield_now().await;
        };
        assert!(matches!(err, PeerError::WriteQueueFull(_)));
        assert!(peer.is_connected());

        // Draining the socket makes room again
        let mut buffer = vec![0u8; frame.len()];
        for _ in 0..accepted {
            remote.read_exact(&mut buffer).await.unwrap();
        }
        assert!(peer.write(frame).is_ok());
    }

    #[tokio::test]
    async fn test_unread_messages_hold_back_the_remote() {
        let (peer, _driver, mut remote) = open_pair_buffered(Duration::from_secs(5), 1024);
        let total = INCOMING_QUEUE_CAPACITY * 20;
        let sender = tokio::spawn(async move {
            let frame = ping().serialize_wire();
            for _ in 0..total {
                remote.write_all(&frame).await.unwrap();
            }
            remote
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!sender.is_finished(), "remote was never held back");
        assert!(peer.is_connected());

        for _ in 0..total {
            assert_eq!(peer.receive_message(Duration::from_secs(5)).await.unwrap(), ping());
        }
        let _remote = sender.await.unwrap();
    }
}

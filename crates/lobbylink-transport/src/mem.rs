//! In-memory transport over [`tokio::io::duplex`], for tests.
//!
//! Engine tests script the "server" side of a conversation by writing to
//! the peer end of the duplex pipe. The upgrade is a flag flip rather than
//! a handshake, which is exactly enough to test the buffered-send window
//! around STARTTLS without a certificate in sight.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::{Connector, Transport, TransportError};

/// A [`Transport`] over an in-process duplex pipe.
pub struct MemoryTransport {
    stream: DuplexStream,
    upgradable: bool,
    encrypted: bool,
}

impl MemoryTransport {
    /// Creates a transport plus the raw peer end of the pipe.
    pub fn pair() -> (Self, DuplexStream) {
        Self::pair_with(false)
    }

    /// Like [`pair`](Self::pair), but the transport will accept an
    /// [`upgrade`](Transport::upgrade) call.
    pub fn pair_upgradable() -> (Self, DuplexStream) {
        Self::pair_with(true)
    }

    fn pair_with(upgradable: bool) -> (Self, DuplexStream) {
        let (ours, theirs) = tokio::io::duplex(64 * 1024);
        (
            Self {
                stream: ours,
                upgradable,
                encrypted: false,
            },
            theirs,
        )
    }
}

impl Transport for MemoryTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0u8; 4096];
        let n = self
            .stream
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn upgrade(&mut self) -> Result<(), TransportError> {
        if !self.upgradable || self.encrypted {
            return Err(TransportError::UpgradeUnsupported(
                "memory transport not marked upgradable".into(),
            ));
        }
        self.encrypted = true;
        Ok(())
    }

    fn supports_upgrade(&self) -> bool {
        self.upgradable && !self.encrypted
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// A [`Connector`] that hands out pre-built [`MemoryTransport`]s in FIFO
/// order and records every address it was asked for — redirect tests queue
/// two transports and assert on the connect log.
#[derive(Default)]
pub struct MemoryConnector {
    queue: Mutex<VecDeque<MemoryTransport>>,
    log: Mutex<Vec<String>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the transport the next `connect` call will return.
    pub fn push(&self, transport: MemoryTransport) {
        self.queue.lock().unwrap().push_back(transport);
    }

    /// Addresses passed to `connect`, in order.
    pub fn connect_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(&self, addr: &str) -> Result<MemoryTransport, TransportError> {
        self.log.lock().unwrap().push(addr.to_owned());
        self.queue.lock().unwrap().pop_front().ok_or_else(|| {
            TransportError::ConnectFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no queued memory transport",
            ))
        })
    }
}

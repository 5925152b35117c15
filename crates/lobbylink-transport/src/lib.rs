//! Transport abstraction layer for lobbylink.
//!
//! Provides the [`Transport`] and [`Connector`] traits that abstract over
//! the byte stream a connection runs on. The engine owns exactly one
//! transport at a time; a server redirect asks the [`Connector`] for a
//! fresh one, and a STARTTLS acknowledgment upgrades the current one in
//! place.
//!
//! # Feature Flags
//!
//! - `tcp` (default) — TCP transport with in-place TLS upgrade via
//!   `tokio-rustls`

mod error;
mod mem;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
pub use mem::{MemoryConnector, MemoryTransport};
#[cfg(feature = "tcp")]
pub use tcp::{TcpConnector, TcpTransport};

/// A connected byte stream the engine can send on and read from.
///
/// Every async method returns a `Send` future so that an engine generic
/// over the transport can be driven from a spawned task. Implementations
/// may still be written as plain `async fn`s.
pub trait Transport: Send + 'static {
    /// Writes the whole buffer to the peer.
    fn send(
        &mut self,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next chunk of bytes from the peer.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly. Chunk
    /// boundaries carry no meaning — framing happens above this trait.
    fn recv(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Upgrades the stream in place to an encrypted channel.
    ///
    /// Called after the server acknowledges the upgrade request, with no
    /// plaintext bytes in flight in either direction.
    fn upgrade(&mut self) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// `true` when [`upgrade`](Self::upgrade) could succeed right now —
    /// the stream is still plaintext and upgrade material is available.
    /// The engine consults this before ever requesting an upgrade.
    fn supports_upgrade(&self) -> bool;

    /// `true` once [`upgrade`](Self::upgrade) has completed.
    fn is_encrypted(&self) -> bool;

    /// Closes the stream. Errors during teardown are ignored by callers.
    fn close(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// Mints transports from addresses.
///
/// The engine holds one connector for the lifetime of a connection: the
/// initial connect and every server-issued redirect go through it, so a
/// redirect replaces the transport without changing how transports are
/// made (including the TLS configuration carried by the connector).
pub trait Connector: Send + 'static {
    /// The transport type this connector produces.
    type Transport: Transport;

    /// Opens a new transport to `addr` (`host:port`).
    fn connect(
        &self,
        addr: &str,
    ) -> impl std::future::Future<Output = Result<Self::Transport, TransportError>> + Send;
}

/// A shared connector connects like the connector it wraps. Lets a test
/// (or a caller pooling connections) keep a handle to the connector after
/// handing it to an engine.
impl<C: Connector + Sync> Connector for std::sync::Arc<C> {
    type Transport = C::Transport;

    async fn connect(&self, addr: &str) -> Result<Self::Transport, TransportError> {
        (**self).connect(addr).await
    }
}

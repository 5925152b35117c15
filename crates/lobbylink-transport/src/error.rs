/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed by the peer.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening a connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The in-place TLS upgrade handshake failed.
    #[error("tls upgrade failed: {0}")]
    UpgradeFailed(#[source] std::io::Error),

    /// The transport cannot be upgraded (no TLS configuration, or it is
    /// already encrypted).
    #[error("tls upgrade unsupported: {0}")]
    UpgradeUnsupported(String),
}

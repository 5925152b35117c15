//! TCP transport with in-place TLS upgrade via `tokio-rustls`.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::{Connector, Transport, TransportError};

/// Read buffer size per `recv` call. Lobby lines are short; 4 KiB keeps
/// syscall count low without holding large buffers per connection.
const READ_BUF_LEN: usize = 4096;

/// TLS parameters carried by the connector and every transport it mints,
/// so the upgrade can happen mid-stream without asking the caller again.
#[derive(Clone)]
struct TlsParams {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    /// Transient state while the upgrade handshake owns the stream. Only
    /// observable if the handshake future is dropped mid-flight.
    Upgrading,
}

/// A [`Transport`] over a TCP stream, upgradable in place to TLS.
pub struct TcpTransport {
    stream: Stream,
    tls: Option<TlsParams>,
}

impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let res = match &mut self.stream {
            Stream::Plain(s) => s.write_all(data).await,
            Stream::Tls(s) => s.write_all(data).await,
            Stream::Upgrading => {
                return Err(TransportError::ConnectionClosed(
                    "stream lost during upgrade".into(),
                ));
            }
        };
        res.map_err(TransportError::SendFailed)
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0u8; READ_BUF_LEN];
        let n = match &mut self.stream {
            Stream::Plain(s) => s.read(&mut buf).await,
            Stream::Tls(s) => s.read(&mut buf).await,
            Stream::Upgrading => {
                return Err(TransportError::ConnectionClosed(
                    "stream lost during upgrade".into(),
                ));
            }
        }
        .map_err(TransportError::ReceiveFailed)?;

        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn upgrade(&mut self) -> Result<(), TransportError> {
        let Some(tls) = self.tls.clone() else {
            return Err(TransportError::UpgradeUnsupported(
                "connector built without TLS configuration".into(),
            ));
        };

        match std::mem::replace(&mut self.stream, Stream::Upgrading) {
            Stream::Plain(tcp) => {
                let upgraded = tls
                    .connector
                    .connect(tls.server_name.clone(), tcp)
                    .await
                    .map_err(TransportError::UpgradeFailed)?;
                tracing::debug!("transport upgraded to tls");
                self.stream = Stream::Tls(Box::new(upgraded));
                Ok(())
            }
            other => {
                self.stream = other;
                Err(TransportError::UpgradeUnsupported(
                    "transport is already encrypted".into(),
                ))
            }
        }
    }

    fn supports_upgrade(&self) -> bool {
        self.tls.is_some() && matches!(self.stream, Stream::Plain(_))
    }

    fn is_encrypted(&self) -> bool {
        matches!(self.stream, Stream::Tls(_))
    }

    async fn close(&mut self) {
        match &mut self.stream {
            Stream::Plain(s) => {
                let _ = s.shutdown().await;
            }
            Stream::Tls(s) => {
                let _ = s.shutdown().await;
            }
            Stream::Upgrading => {}
        }
    }
}

/// Mints [`TcpTransport`]s; optionally carries the TLS client config used
/// for mid-stream upgrades.
#[derive(Clone, Default)]
pub struct TcpConnector {
    tls: Option<TlsParams>,
}

impl TcpConnector {
    /// A plain-TCP connector. Transports it mints cannot be upgraded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose transports can upgrade to TLS against
    /// `server_name` using the given client configuration.
    ///
    /// # Errors
    ///
    /// [`TransportError::UpgradeUnsupported`] when `server_name` is not a
    /// valid DNS name or IP address.
    pub fn with_tls(
        config: Arc<rustls::ClientConfig>,
        server_name: &str,
    ) -> Result<Self, TransportError> {
        let server_name = ServerName::try_from(server_name.to_owned()).map_err(|e| {
            TransportError::UpgradeUnsupported(format!(
                "invalid tls server name {server_name:?}: {e}"
            ))
        })?;
        Ok(Self {
            tls: Some(TlsParams {
                connector: TlsConnector::from(config),
                server_name,
            }),
        })
    }

    /// `true` when transports minted by this connector can be upgraded.
    pub fn supports_tls(&self) -> bool {
        self.tls.is_some()
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self, addr: &str) -> Result<TcpTransport, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        stream
            .set_nodelay(true)
            .map_err(TransportError::ConnectFailed)?;
        tracing::debug!(addr, "tcp transport connected");
        Ok(TcpTransport {
            stream: Stream::Plain(stream),
            tls: self.tls.clone(),
        })
    }
}

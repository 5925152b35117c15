//! The caller-facing handle and builder.
//!
//! [`LobbyClient`] is a cheap clonable handle onto the connection actor:
//! an op sender plus a status watch. Dropping every handle tears the
//! connection down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use lobbylink_keepalive::{KeepaliveConfig, KeepaliveScheduler};
use lobbylink_session::{ProtocolFeatures, SessionPhase};
use lobbylink_transport::{Connector, TcpConnector};

use crate::command::{OutboundCommand, ResponseHandler};
use crate::commands::inbound::{Accepted, Denied};
use crate::commands::outbound::Login;
use crate::connection::{self, Op};
use crate::error::LobbyError;
use crate::event::LobbyEvent;

// ----------------------------------------------------------------------
// Status snapshot
// ----------------------------------------------------------------------

/// A point-in-time view of the connection, published through a watch
/// channel after every processed chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Where the session state machine currently stands.
    pub phase: SessionPhase,
    /// Features negotiated from the most recent greeting.
    pub features: ProtocolFeatures,
    /// Round-trip time of the most recent completed heartbeat.
    pub last_rtt: Option<Duration>,
}

/// The terminal result of a [`LobbyClient::login`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted { username: String },
    Denied { reason: String },
}

// ----------------------------------------------------------------------
// Builder
// ----------------------------------------------------------------------

/// Configures and launches a connection.
pub struct LobbyClientBuilder {
    keepalive: KeepaliveConfig,
    event_capacity: usize,
    tls: Option<(Arc<rustls::ClientConfig>, String)>,
}

impl Default for LobbyClientBuilder {
    fn default() -> Self {
        Self {
            keepalive: KeepaliveConfig::default(),
            event_capacity: 256,
            tls: None,
        }
    }
}

impl LobbyClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long the link may sit idle before a heartbeat goes out.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive = KeepaliveConfig::with_interval(interval);
        self
    }

    /// Capacity of the event channel. A caller that stops draining
    /// events backpressures the engine once this fills.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Enables the mid-stream TLS upgrade, validating certificates for
    /// `server_name`. Without this, a server advertising the upgrade is
    /// ignored and the connection stays in the clear.
    pub fn tls(mut self, config: Arc<rustls::ClientConfig>, server_name: &str) -> Self {
        self.tls = Some((config, server_name.to_owned()));
        self
    }

    /// Launches a TCP connection to `addr` (`host:port`).
    ///
    /// Returns immediately; connection progress arrives as events,
    /// starting with `Connected` (or `Disconnected` if the dial fails).
    /// Must be called from within a tokio runtime.
    pub fn connect(
        self,
        addr: &str,
    ) -> Result<(LobbyClient, mpsc::Receiver<LobbyEvent>), LobbyError> {
        let connector = match &self.tls {
            Some((config, server_name)) => TcpConnector::with_tls(config.clone(), server_name)?,
            None => TcpConnector::new(),
        };
        Ok(self.connect_with(connector, addr))
    }

    /// Like [`connect`](Self::connect), over a caller-supplied connector.
    pub fn connect_with<C: Connector>(
        self,
        connector: C,
        addr: &str,
    ) -> (LobbyClient, mpsc::Receiver<LobbyEvent>) {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(self.event_capacity);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let scheduler = KeepaliveScheduler::new(self.keepalive);
        tokio::spawn(connection::run(
            connector,
            addr.to_owned(),
            scheduler,
            op_rx,
            event_tx,
            status_tx,
        ));
        let client = LobbyClient {
            ops: op_tx,
            status: status_rx,
        };
        (client, event_rx)
    }
}

// ----------------------------------------------------------------------
// Handle
// ----------------------------------------------------------------------

/// A handle onto a running connection.
#[derive(Clone)]
pub struct LobbyClient {
    ops: mpsc::UnboundedSender<Op>,
    status: watch::Receiver<ConnectionStatus>,
}

impl LobbyClient {
    pub fn builder() -> LobbyClientBuilder {
        LobbyClientBuilder::new()
    }

    /// Sends a command. The engine assigns the sequence id.
    pub fn send(&self, command: impl OutboundCommand + 'static) -> Result<(), LobbyError> {
        self.submit(Op::Send {
            command: Box::new(command),
            handler: None,
        })
    }

    /// Sends a command and registers `handler` under its sequence id.
    ///
    /// The handler runs on the engine task for every response echoing
    /// that id, until it returns `true` to claim one. Whether or not it
    /// claims, the response still executes normally afterwards.
    pub fn send_with_handler(
        &self,
        command: impl OutboundCommand + 'static,
        handler: ResponseHandler,
    ) -> Result<(), LobbyError> {
        self.submit(Op::Send {
            command: Box::new(command),
            handler: Some(handler),
        })
    }

    /// Moves the connection to another server, keeping session state and
    /// pending correlation handlers. Handlers awaiting responses from
    /// the old server may never resolve.
    pub fn redirect(&self, addr: &str) -> Result<(), LobbyError> {
        self.submit(Op::Redirect {
            addr: addr.to_owned(),
        })
    }

    /// Sends a goodbye and shuts the connection down. The event stream
    /// ends with a `Disconnected` event.
    pub fn disconnect(&self) -> Result<(), LobbyError> {
        self.submit(Op::Disconnect)
    }

    /// The latest published status snapshot.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn phase(&self) -> SessionPhase {
        self.status().phase
    }

    pub fn features(&self) -> ProtocolFeatures {
        self.status().features
    }

    pub fn last_rtt(&self) -> Option<Duration> {
        self.status().last_rtt
    }

    /// Logs in and waits for the server's verdict.
    ///
    /// Sugar over [`send_with_handler`](Self::send_with_handler): the
    /// handler claims the first accepted/denied response echoing the
    /// login's sequence id and leaves anything else to later responses.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, LobbyError> {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let handler: ResponseHandler = Box::new(move |command, _ctx| {
            let outcome = if let Some(accepted) = command.as_any().downcast_ref::<Accepted>() {
                Some(LoginOutcome::Accepted {
                    username: accepted.username.clone(),
                })
            } else if let Some(denied) = command.as_any().downcast_ref::<Denied>() {
                Some(LoginOutcome::Denied {
                    reason: denied.reason.clone(),
                })
            } else {
                None
            };
            match outcome {
                Some(outcome) => {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(outcome);
                    }
                    true
                }
                // Some other message echoed our id (agreement flow);
                // keep waiting for the verdict.
                None => false,
            }
        });
        self.send_with_handler(Login::new(username, password), handler)?;
        rx.await.map_err(|_| LobbyError::ConnectionClosed)
    }

    fn submit(&self, op: Op) -> Result<(), LobbyError> {
        self.ops.send(op).map_err(|_| LobbyError::ConnectionClosed)
    }
}

//! The connection actor.
//!
//! One tokio task owns everything with interior state: the transport, the
//! framer, the registry, the session context, the correlation table, and
//! the keepalive scheduler. Callers talk to it through an op channel and
//! read from it through the event channel and the status watch. No locks,
//! no shared mutability.
//!
//! Every incoming line takes the same path: parse the routing envelope,
//! decode through the phase registry, offer the command to a waiting
//! correlation handler, then execute it unconditionally. Execution queues
//! [`Effect`]s; the actor drains them afterwards, so registry swaps,
//! redirects, and TLS upgrades happen between messages, never mid-decode.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use lobbylink_keepalive::KeepaliveScheduler;
use lobbylink_protocol::{LineFramer, RawLine};
use lobbylink_transport::{Connector, Transport, TransportError};

use crate::client::ConnectionStatus;
use crate::command::{Effect, OutboundCommand, ResponseHandler, SessionContext};
use crate::commands::outbound::{Exit, Ping, StartTls};
use crate::correlation::CorrelationTable;
use crate::event::{DisconnectReason, LobbyEvent};
use crate::registry::CommandRegistry;

// ----------------------------------------------------------------------
// Ops
// ----------------------------------------------------------------------

/// A request from a [`LobbyClient`](crate::LobbyClient) handle.
pub(crate) enum Op {
    /// Send a command, optionally registering a correlation handler
    /// under the sequence id the actor assigns.
    Send {
        command: Box<dyn OutboundCommand>,
        handler: Option<ResponseHandler>,
    },
    /// Tear down the transport and reconnect elsewhere, keeping session
    /// and correlation state.
    Redirect { addr: String },
    /// Send a goodbye and shut the connection down.
    Disconnect,
}

/// What woke the actor. Captured first, acted on second, so the select
/// arms only borrow the fields they poll.
enum Wake {
    Op(Option<Op>),
    Inbound(Result<Option<Vec<u8>>, TransportError>),
    Heartbeat,
}

// ----------------------------------------------------------------------
// Actor
// ----------------------------------------------------------------------

struct Connection<C: Connector> {
    connector: C,
    transport: C::Transport,
    framer: LineFramer,
    registry: CommandRegistry,
    ctx: SessionContext,
    correlation: CorrelationTable,
    next_seq: u64,
    keepalive: KeepaliveScheduler,
    /// STLS sent, OK not yet seen.
    upgrade_pending: bool,
    /// Sends are held back until the post-upgrade greeting flushes them.
    buffering: bool,
    send_buffer: Vec<String>,
    ops: mpsc::UnboundedReceiver<Op>,
    events: mpsc::Sender<LobbyEvent>,
    status: watch::Sender<ConnectionStatus>,
}

/// Connects and runs the actor to completion. Always finishes with a
/// `Disconnected` event, including when the initial connect fails.
pub(crate) async fn run<C: Connector>(
    connector: C,
    addr: String,
    keepalive: KeepaliveScheduler,
    ops: mpsc::UnboundedReceiver<Op>,
    events: mpsc::Sender<LobbyEvent>,
    status: watch::Sender<ConnectionStatus>,
) {
    let transport = match connector.connect(&addr).await {
        Ok(transport) => transport,
        Err(err) => {
            warn!(addr, error = %err, "connect failed");
            let _ = events
                .send(LobbyEvent::Disconnected {
                    reason: DisconnectReason::TransportError(err.to_string()),
                })
                .await;
            return;
        }
    };
    info!(addr, "connected");
    let _ = events.send(LobbyEvent::Connected { addr }).await;

    let mut conn = Connection {
        connector,
        transport,
        framer: LineFramer::new(),
        registry: CommandRegistry::pre_greeting(),
        ctx: SessionContext::new(),
        correlation: CorrelationTable::new(),
        next_seq: 0,
        keepalive,
        upgrade_pending: false,
        buffering: false,
        send_buffer: Vec::new(),
        ops,
        events,
        status,
    };
    conn.keepalive.reset();
    conn.run_loop().await;
}

impl<C: Connector> Connection<C> {
    async fn run_loop(&mut self) {
        let reason = loop {
            let wake = tokio::select! {
                op = self.ops.recv() => Wake::Op(op),
                inbound = self.transport.recv() => Wake::Inbound(inbound),
                () = self.keepalive.wait() => Wake::Heartbeat,
            };
            match wake {
                // All client handles dropped: nobody is left to observe
                // the connection, so take it down.
                Wake::Op(None) | Wake::Op(Some(Op::Disconnect)) => {
                    // Best-effort goodbye. An open upgrade window would
                    // hold the line back forever, so close the window and
                    // drop anything queued for a stream that will never
                    // come up.
                    if self.buffering {
                        debug!(
                            dropped = self.send_buffer.len(),
                            "abandoning upgrade window for shutdown"
                        );
                        self.buffering = false;
                        self.send_buffer.clear();
                    }
                    if let Err(err) = self.send_command(Box::new(Exit::default()), None).await {
                        debug!(error = %err, "goodbye not delivered");
                    }
                    break DisconnectReason::Requested;
                }
                Wake::Op(Some(Op::Send { command, handler })) => {
                    if let Err(err) = self.send_command(command, handler).await {
                        break DisconnectReason::TransportError(err.to_string());
                    }
                }
                Wake::Op(Some(Op::Redirect { addr })) => {
                    if let Err(err) = self.redirect(&addr).await {
                        break DisconnectReason::TransportError(err.to_string());
                    }
                }
                Wake::Inbound(Ok(Some(chunk))) => {
                    if let Some(reason) = self.process_chunk(&chunk).await {
                        break reason;
                    }
                }
                Wake::Inbound(Ok(None)) => break DisconnectReason::PeerClosed,
                Wake::Inbound(Err(err)) => {
                    break DisconnectReason::TransportError(err.to_string());
                }
                Wake::Heartbeat => {
                    if let Err(err) = self.send_heartbeat().await {
                        break DisconnectReason::TransportError(err.to_string());
                    }
                }
            }
        };
        self.shutdown(reason).await;
    }

    // ------------------------------------------------------------------
    // Outbound path
    // ------------------------------------------------------------------

    /// Assigns the next sequence id, registers the handler under it, and
    /// writes (or buffers, during an upgrade window) the framed line.
    ///
    /// The handler is registered before the bytes leave: a response can
    /// never race its own registration.
    async fn send_command(
        &mut self,
        command: Box<dyn OutboundCommand>,
        handler: Option<ResponseHandler>,
    ) -> Result<(), TransportError> {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(handler) = handler {
            self.correlation.register(seq, handler);
        }
        let line = format!("#{seq} {}\n", command.encode());
        // Every send pushes the heartbeat deadline out; only a fully
        // idle link pings.
        self.keepalive.reset();
        if self.buffering {
            debug!(seq, keyword = command.keyword(), "buffered during upgrade");
            self.send_buffer.push(line);
            return Ok(());
        }
        trace!(seq, keyword = command.keyword(), "send");
        self.transport.send(line.as_bytes()).await
    }

    async fn send_heartbeat(&mut self) -> Result<(), TransportError> {
        self.keepalive.record_ping();
        let handler: ResponseHandler = Box::new(|_command, ctx| {
            ctx.push_effect(Effect::RecordPong);
            true
        });
        trace!("heartbeat");
        self.send_command(Box::new(Ping), Some(handler)).await
    }

    // ------------------------------------------------------------------
    // Inbound path
    // ------------------------------------------------------------------

    async fn process_chunk(&mut self, chunk: &[u8]) -> Option<DisconnectReason> {
        let lines = self.framer.push(chunk);
        for line in lines {
            self.dispatch_line(&line);
            if let Some(reason) = self.apply_effects().await {
                return Some(reason);
            }
        }
        self.publish_status();
        None
    }

    /// The dual dispatch path: correlation handler first (if the line
    /// carries a sequence id), then unconditional execution.
    fn dispatch_line(&mut self, line: &str) {
        let raw = match RawLine::parse(line) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, line, "dropping malformed line");
                return;
            }
        };
        let Some(decoded) = self.registry.decode(&raw.keyword, &raw.body) else {
            warn!(keyword = %raw.keyword, "dropping line: keyword not in this phase");
            return;
        };
        let command = match decoded {
            Ok(command) => command,
            Err(err) => {
                warn!(keyword = %raw.keyword, error = %err, "dropping undecodable line");
                return;
            }
        };
        if let Some(seq) = raw.seq {
            let handled = self.correlation.dispatch(seq, &*command, &mut self.ctx);
            trace!(seq, handled, keyword = %raw.keyword, "correlated");
        }
        command.execute(&mut self.ctx);
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    async fn apply_effects(&mut self) -> Option<DisconnectReason> {
        for effect in self.ctx.drain_effects() {
            let outcome = match effect {
                Effect::UseFullRegistry => {
                    self.registry = CommandRegistry::full();
                    Ok(())
                }
                Effect::RequestTlsUpgrade => self.request_upgrade().await,
                Effect::CompleteTlsUpgrade => self.complete_upgrade().await,
                Effect::FlushSendBuffer => self.flush_send_buffer().await,
                Effect::Redirect { addr } => self.redirect(&addr).await,
                Effect::RecordPong => {
                    self.keepalive.record_pong();
                    Ok(())
                }
                Effect::Emit(event) => {
                    let _ = self.events.send(event).await;
                    Ok(())
                }
            };
            if let Err(err) = outcome {
                return Some(DisconnectReason::TransportError(err.to_string()));
            }
        }
        None
    }

    /// Opens the upgrade window: send the request in the clear, then hold
    /// every later outbound line until the post-upgrade greeting.
    async fn request_upgrade(&mut self) -> Result<(), TransportError> {
        if self.upgrade_pending || self.transport.is_encrypted() {
            debug!("upgrade already pending or done");
            return Ok(());
        }
        if !self.transport.supports_upgrade() {
            debug!("server offers tls but transport cannot upgrade");
            return Ok(());
        }
        self.send_command(Box::new(StartTls), None).await?;
        self.upgrade_pending = true;
        self.buffering = true;
        Ok(())
    }

    async fn complete_upgrade(&mut self) -> Result<(), TransportError> {
        if !self.upgrade_pending {
            debug!("acknowledgment without a pending upgrade");
            return Ok(());
        }
        self.upgrade_pending = false;
        self.transport.upgrade().await?;
        info!("tls established");
        let _ = self.events.send(LobbyEvent::TlsUpgraded).await;
        Ok(())
    }

    async fn flush_send_buffer(&mut self) -> Result<(), TransportError> {
        self.buffering = false;
        for line in std::mem::take(&mut self.send_buffer) {
            self.transport.send(line.as_bytes()).await?;
        }
        Ok(())
    }

    /// Reconnects to `addr`. Session state, the correlation table, and
    /// the sequence counter survive; partial input and the registry phase
    /// do not — the new server must greet us before anything else.
    async fn redirect(&mut self, addr: &str) -> Result<(), TransportError> {
        info!(addr, "redirecting");
        self.transport.close().await;
        self.framer.clear();
        self.registry = CommandRegistry::pre_greeting();
        self.upgrade_pending = false;
        self.buffering = false;
        if !self.send_buffer.is_empty() {
            warn!(
                dropped = self.send_buffer.len(),
                "discarding sends buffered for the previous server"
            );
            self.send_buffer.clear();
        }
        self.transport = self.connector.connect(addr).await?;
        self.keepalive.reset();
        let _ = self
            .events
            .send(LobbyEvent::RedirectStarted {
                addr: addr.to_owned(),
            })
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teardown & status
    // ------------------------------------------------------------------

    async fn shutdown(&mut self, reason: DisconnectReason) {
        self.transport.close().await;
        self.ctx.session.reset();
        self.registry = CommandRegistry::pre_greeting();
        self.keepalive.disarm();
        self.publish_status();
        info!(?reason, "disconnected");
        // Always the final event for this connection.
        let _ = self.events.send(LobbyEvent::Disconnected { reason }).await;
    }

    fn publish_status(&self) {
        let next = ConnectionStatus {
            phase: self.ctx.session.phase(),
            features: self.ctx.features,
            last_rtt: self.keepalive.last_rtt(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

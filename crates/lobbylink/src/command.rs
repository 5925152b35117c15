//! Command capability traits and the execution context.
//!
//! Inbound and outbound commands are disjoint capability sets. An
//! *outbound* command serializes itself to a wire payload. An *inbound*
//! command is built by a registry decoder and exposes a single
//! [`execute`](InboundCommand::execute) capability — all shared-state
//! mutation for a message happens there, exactly once, whether or not a
//! correlation handler also consumed it.
//!
//! `execute` gets a [`SessionContext`]: the session and feature flags by
//! `&mut`, plus an effect queue for anything that needs the transport
//! (registry swap, redirect, TLS upgrade). Commands never touch the
//! transport directly — the connection actor drains the queue afterwards,
//! so a transport swap can never race an in-flight send.

use std::any::Any;

use lobbylink_session::{ProtocolFeatures, Session};

use crate::LobbyEvent;

/// A transport-level action requested by a command's `execute` (or by a
/// correlation handler), performed by the connection actor after dispatch.
#[derive(Debug)]
pub enum Effect {
    /// The greeting was parsed: swap in the full post-greeting registry.
    UseFullRegistry,
    /// The greeting advertises TLS: begin the upgrade negotiation (send
    /// the upgrade request, buffer subsequent sends). Ignored when the
    /// transport cannot upgrade or negotiation is already under way.
    RequestTlsUpgrade,
    /// The server acknowledged the upgrade request: perform the in-place
    /// handshake. Ignored when no upgrade is pending.
    CompleteTlsUpgrade,
    /// A greeting was (re)processed: release any sends buffered across
    /// the upgrade window.
    FlushSendBuffer,
    /// Tear down the transport and reconnect to this address.
    Redirect { addr: String },
    /// The heartbeat acknowledgment arrived: record the round trip.
    RecordPong,
    /// Deliver an event to the caller.
    Emit(LobbyEvent),
}

/// The state a command may touch while executing.
///
/// Owned by the connection actor; handed to `execute` and to correlation
/// handlers by `&mut`, always on the actor task.
pub struct SessionContext {
    /// The session state machine. Only command execution mutates it.
    pub session: Session,
    /// Features negotiated from the last greeting.
    pub features: ProtocolFeatures,
    effects: Vec<Effect>,
}

impl SessionContext {
    pub(crate) fn new() -> Self {
        Self {
            session: Session::default(),
            features: ProtocolFeatures::default(),
            effects: Vec::new(),
        }
    }

    /// Queues a transport-level action for the actor.
    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Queues an event for the caller.
    pub fn emit(&mut self, event: LobbyEvent) {
        self.effects.push(Effect::Emit(event));
    }

    pub(crate) fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    #[cfg(test)]
    pub(crate) fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

/// A decoded incoming message.
///
/// Implementations are constructed by the registry's decode functions and
/// must keep `execute` idempotent-free of transport I/O: state mutation
/// here, transport actions via [`Effect`].
pub trait InboundCommand: Any + Send {
    /// The wire keyword this command was decoded from.
    fn keyword(&self) -> &'static str;

    /// Applies this message to the connection state. Runs exactly once
    /// per message, regardless of correlation-handler outcomes.
    fn execute(&self, ctx: &mut SessionContext);

    /// Upcast for correlation handlers that awaited a specific type.
    fn as_any(&self) -> &dyn Any;
}

/// An outgoing message.
pub trait OutboundCommand: Send {
    /// The wire keyword, for logs.
    fn keyword(&self) -> &'static str;

    /// The full payload as it goes on the wire, keyword included, without
    /// the sequence prefix or line terminator (the engine adds both).
    fn encode(&self) -> String;
}

/// A one-shot response handler registered alongside a send.
///
/// Invoked for every incoming message that echoes the send's sequence id,
/// until it returns `true` ("fully handled") — at which point the entry is
/// removed and the handler never runs again.
pub type ResponseHandler =
    Box<dyn FnMut(&dyn InboundCommand, &mut SessionContext) -> bool + Send>;

//! # lobbylink
//!
//! Client-side protocol engine for a line-oriented, text-based multiplayer
//! lobby protocol: framing, command dispatch, request/response correlation,
//! the session state machine, keepalive heartbeats, and mid-stream
//! redirects and TLS upgrades.
//!
//! The engine runs as a single background task that owns all connection
//! state; callers hold a cheap [`LobbyClient`] handle and a stream of
//! [`LobbyEvent`]s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lobbylink::{LobbyClient, LobbyEvent};
//!
//! # async fn run() -> Result<(), lobbylink::LobbyError> {
//! let (client, mut events) = LobbyClient::builder()
//!     .connect("lobby.example.org:8200")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LobbyEvent::GreetingParsed { .. } => {
//!             // safe to log in now
//!         }
//!         LobbyEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod command;
pub mod commands;
mod connection;
mod correlation;
mod error;
mod event;
mod registry;

pub use client::{ConnectionStatus, LobbyClient, LobbyClientBuilder, LoginOutcome};
pub use command::{Effect, InboundCommand, OutboundCommand, ResponseHandler, SessionContext};
pub use correlation::CorrelationTable;
pub use error::LobbyError;
pub use event::{DisconnectReason, LobbyEvent};
pub use registry::CommandRegistry;

// Re-export the vocabulary types callers read through the status snapshot.
pub use lobbylink_session::{ProtocolFeatures, SessionPhase};

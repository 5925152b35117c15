//! Events delivered to the caller.
//!
//! Lifecycle and protocol happenings surface here, never as panics or as
//! errors thrown across the engine task boundary. The channel is bounded;
//! a caller that stops draining it eventually backpressures the engine,
//! which is preferable to unbounded memory growth.

use lobbylink_session::ProtocolFeatures;

/// Why the connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The caller asked for the disconnect.
    Requested,
    /// The server closed the stream cleanly.
    PeerClosed,
    /// The transport failed (I/O error, failed redirect or upgrade).
    TransportError(String),
}

/// Something happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// The transport is up; the greeting has not arrived yet.
    Connected { addr: String },
    /// The server greeting was parsed and features were negotiated.
    GreetingParsed {
        protocol_version: String,
        engine_version: String,
        features: ProtocolFeatures,
    },
    /// Login completed; the session is now authenticated.
    LoginAccepted { username: String },
    /// Login rejected; the session fell back to unauthenticated.
    LoginDenied { reason: String },
    /// The full agreement text is available and must be confirmed before
    /// login can complete.
    AgreementReceived { text: String },
    /// One message-of-the-day line.
    Motd { line: String },
    /// The server confirmed a channel join.
    ChannelJoined { channel: String },
    /// A chat line in a joined channel.
    Said {
        channel: String,
        author: String,
        text: String,
        /// `true` for emote (`/me`) messages.
        emote: bool,
    },
    /// A user appeared on the server.
    UserJoined { name: String, country: String },
    /// A user left the server.
    UserLeft { name: String },
    /// The server ordered a redirect; the transport is being replaced.
    RedirectStarted { addr: String },
    /// The in-place TLS upgrade completed.
    TlsUpgraded,
    /// The connection is gone. Always the final event.
    Disconnected { reason: DisconnectReason },
}

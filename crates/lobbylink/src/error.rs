//! Unified error type for the lobbylink engine.

use lobbylink_protocol::ProtocolError;
use lobbylink_session::SessionError;
use lobbylink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lobbylink` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A transport-level error (connect, send, recv, upgrade).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing grammar, malformed line).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (invalid transition, not authenticated).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The engine task is gone — the connection was closed or never
    /// established.
    #[error("connection closed")]
    ConnectionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let lobby_err: LobbyError = err.into();
        assert!(matches!(lobby_err, LobbyError::Transport(_)));
        assert!(lobby_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MissingKeyword;
        let lobby_err: LobbyError = err.into();
        assert!(matches!(lobby_err, LobbyError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotAuthenticated;
        let lobby_err: LobbyError = err.into();
        assert!(matches!(lobby_err, LobbyError::Session(_)));
    }
}

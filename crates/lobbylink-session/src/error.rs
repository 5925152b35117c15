use crate::SessionPhase;

/// Errors that can occur in the session layer.
///
/// A transition error never tears the connection down — the engine logs it
/// and drops the offending command, because a confused server must not be
/// able to wedge the client.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// A command signalled a transition the current phase does not allow
    /// (e.g. `ACCEPTED` before any greeting was seen).
    #[error("invalid transition: {event} while {from:?}")]
    InvalidTransition {
        /// Phase the session was in.
        from: SessionPhase,
        /// The event that was rejected.
        event: &'static str,
    },

    /// State scoped to an authenticated session was touched while no user
    /// is logged in.
    #[error("not authenticated")]
    NotAuthenticated,
}

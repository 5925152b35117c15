//! The session state machine.
//!
//! ```text
//! None ──greeting──▶ Unauthenticated ──agreement──▶ PendingAgreement
//!                        │    ▲                          │
//!                        │    └───────denied─────────────┤
//!                     accepted                        accepted
//!                        │                               │
//!                        ▼                               ▼
//!                           Authenticated ◀──────────────┘
//! ```
//!
//! Every transition is driven by exactly one inbound command's `execute`;
//! a transport loss resets the machine to `None` (the next greeting starts
//! the cycle over). Per-phase data is owned by the variant that needs it —
//! the roster and channel map live inside [`AuthenticatedSession`] and die
//! with it.

use std::collections::{BTreeMap, BTreeSet};

use crate::SessionError;

/// The mutually exclusive phases, as a plain tag for snapshots and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Before the server greeting has been parsed.
    #[default]
    None,
    /// Greeting seen, nobody logged in.
    Unauthenticated,
    /// The server requires the user to accept an agreement before login
    /// completes.
    PendingAgreement,
    /// Login accepted; per-session collections are live.
    Authenticated,
}

/// Agreement text accumulated while the server streams it line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAgreement {
    /// Agreement lines in arrival order.
    pub lines: Vec<String>,
    /// Set once the server signals the end of the text.
    pub complete: bool,
}

impl PendingAgreement {
    /// The full agreement text, newline-joined.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A user visible on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub country: String,
}

/// One line of channel chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub author: String,
    pub text: String,
    /// `true` for emote (`/me`) messages.
    pub emote: bool,
}

/// A joined chat channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    pub members: BTreeSet<String>,
    pub history: Vec<ChatLine>,
}

/// State scoped to a logged-in user. Created whole on login-accepted,
/// dropped whole when the session collapses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticatedSession {
    /// The name the server accepted.
    pub username: String,
    /// Every user the server has announced, by name.
    pub users: BTreeMap<String, User>,
    /// Channels this user has joined, by name.
    pub channels: BTreeMap<String, Channel>,
}

impl AuthenticatedSession {
    pub fn new(username: String) -> Self {
        Self {
            username,
            ..Self::default()
        }
    }
}

/// The session state machine. One per connection, owned by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    /// Initial state, before the greeting.
    #[default]
    None,
    Unauthenticated,
    PendingAgreement(PendingAgreement),
    Authenticated(AuthenticatedSession),
}

impl Session {
    /// The phase tag for this state.
    pub fn phase(&self) -> SessionPhase {
        match self {
            Session::None => SessionPhase::None,
            Session::Unauthenticated => SessionPhase::Unauthenticated,
            Session::PendingAgreement(_) => SessionPhase::PendingAgreement,
            Session::Authenticated(_) => SessionPhase::Authenticated,
        }
    }

    /// A server greeting was parsed. Valid from any state: an initial
    /// connect starts from `None`, a redirect or post-upgrade greeting
    /// reprocesses from whatever was left.
    pub fn greeting_received(&mut self) {
        *self = Session::Unauthenticated;
    }

    /// One line of agreement text arrived.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] unless the session is
    /// `Unauthenticated` (first line) or already `PendingAgreement`.
    pub fn agreement_line(&mut self, line: String) -> Result<(), SessionError> {
        match self {
            Session::Unauthenticated => {
                *self = Session::PendingAgreement(PendingAgreement {
                    lines: vec![line],
                    complete: false,
                });
                Ok(())
            }
            Session::PendingAgreement(pending) if !pending.complete => {
                pending.lines.push(line);
                Ok(())
            }
            other => Err(SessionError::InvalidTransition {
                from: other.phase(),
                event: "agreement line",
            }),
        }
    }

    /// The server signalled the end of the agreement text.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] unless pending an agreement.
    pub fn agreement_end(&mut self) -> Result<&PendingAgreement, SessionError> {
        match self {
            Session::PendingAgreement(pending) => {
                pending.complete = true;
                Ok(pending)
            }
            other => Err(SessionError::InvalidTransition {
                from: other.phase(),
                event: "agreement end",
            }),
        }
    }

    /// Login accepted: attach fresh per-session state.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] from `None` (no greeting yet)
    /// or when already authenticated.
    pub fn login_accepted(&mut self, username: String) -> Result<(), SessionError> {
        match self {
            Session::Unauthenticated | Session::PendingAgreement(_) => {
                *self = Session::Authenticated(AuthenticatedSession::new(username));
                Ok(())
            }
            other => Err(SessionError::InvalidTransition {
                from: other.phase(),
                event: "login accepted",
            }),
        }
    }

    /// Login denied: fall back to unauthenticated.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] from `None` — a denial cannot
    /// precede the greeting.
    pub fn login_denied(&mut self) -> Result<(), SessionError> {
        match self {
            Session::Unauthenticated | Session::PendingAgreement(_) => {
                *self = Session::Unauthenticated;
                Ok(())
            }
            other => Err(SessionError::InvalidTransition {
                from: other.phase(),
                event: "login denied",
            }),
        }
    }

    /// Transport gone: collapse to the pre-greeting state. Everything
    /// scoped to the login is dropped here.
    pub fn reset(&mut self) {
        *self = Session::None;
    }

    /// The authenticated state, if any.
    pub fn authenticated(&self) -> Option<&AuthenticatedSession> {
        match self {
            Session::Authenticated(auth) => Some(auth),
            _ => None,
        }
    }

    /// Mutable access to the authenticated state.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] in any other phase.
    pub fn authenticated_mut(&mut self) -> Result<&mut AuthenticatedSession, SessionError> {
        match self {
            Session::Authenticated(auth) => Ok(auth),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn authenticated(name: &str) -> Session {
        let mut session = Session::default();
        session.greeting_received();
        session.login_accepted(name.into()).unwrap();
        session
    }

    // =====================================================================
    // Phase transitions
    // =====================================================================

    #[test]
    fn test_initial_phase_is_none() {
        assert_eq!(Session::default().phase(), SessionPhase::None);
    }

    #[test]
    fn test_greeting_moves_to_unauthenticated() {
        let mut session = Session::default();
        session.greeting_received();
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn test_direct_login_without_agreement() {
        let session = authenticated("bob");
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        assert_eq!(session.authenticated().unwrap().username, "bob");
    }

    #[test]
    fn test_login_via_agreement() {
        let mut session = Session::default();
        session.greeting_received();
        session.agreement_line("Terms of use".into()).unwrap();
        session.agreement_line("Be nice.".into()).unwrap();
        assert_eq!(session.phase(), SessionPhase::PendingAgreement);

        let pending = session.agreement_end().unwrap();
        assert!(pending.complete);
        assert_eq!(pending.text(), "Terms of use\nBe nice.");

        session.login_accepted("bob".into()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn test_denied_falls_back_to_unauthenticated() {
        let mut session = Session::default();
        session.greeting_received();
        session.login_denied().unwrap();
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn test_denied_from_pending_agreement() {
        let mut session = Session::default();
        session.greeting_received();
        session.agreement_line("text".into()).unwrap();
        session.login_denied().unwrap();
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn test_accepted_before_greeting_is_rejected() {
        let mut session = Session::default();
        let err = session.login_accepted("bob".into()).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: SessionPhase::None,
                event: "login accepted",
            }
        );
        assert_eq!(session.phase(), SessionPhase::None);
    }

    #[test]
    fn test_double_login_is_rejected() {
        let mut session = authenticated("bob");
        assert!(session.login_accepted("eve".into()).is_err());
        assert_eq!(session.authenticated().unwrap().username, "bob");
    }

    #[test]
    fn test_agreement_line_after_end_is_rejected() {
        let mut session = Session::default();
        session.greeting_received();
        session.agreement_line("text".into()).unwrap();
        session.agreement_end().unwrap();
        assert!(session.agreement_line("late".into()).is_err());
    }

    #[test]
    fn test_reset_collapses_to_none() {
        let mut session = authenticated("bob");
        session
            .authenticated_mut()
            .unwrap()
            .users
            .insert("alice".into(), User {
                name: "alice".into(),
                country: "SE".into(),
            });

        session.reset();
        assert_eq!(session.phase(), SessionPhase::None);
        assert!(session.authenticated().is_none());
    }

    #[test]
    fn test_greeting_after_redirect_restarts_cycle() {
        // A redirect leaves the old session in place until the new
        // greeting arrives and re-derives it.
        let mut session = authenticated("bob");
        session.greeting_received();
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    // =====================================================================
    // Authenticated collections
    // =====================================================================

    #[test]
    fn test_authenticated_mut_requires_login() {
        let mut session = Session::default();
        assert_eq!(
            session.authenticated_mut().unwrap_err(),
            SessionError::NotAuthenticated
        );
    }

    #[test]
    fn test_fresh_login_has_empty_collections() {
        let session = authenticated("bob");
        let auth = session.authenticated().unwrap();
        assert!(auth.users.is_empty());
        assert!(auth.channels.is_empty());
    }

    #[test]
    fn test_relogin_drops_previous_collections() {
        let mut session = authenticated("bob");
        session
            .authenticated_mut()
            .unwrap()
            .channels
            .insert("main".into(), Channel::default());

        // Connection drops, user logs in again from scratch.
        session.reset();
        session.greeting_received();
        session.login_accepted("bob".into()).unwrap();
        assert!(session.authenticated().unwrap().channels.is_empty());
    }
}

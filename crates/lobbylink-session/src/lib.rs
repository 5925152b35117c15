//! Session state for a lobby connection.
//!
//! A connection's [`Session`] is a closed state machine: absent before the
//! server greeting, then unauthenticated, optionally pending an agreement,
//! then authenticated. Transitions happen only inside the execution of the
//! specific inbound commands that signal them — no other code assigns the
//! session.
//!
//! [`ProtocolFeatures`] is the other half of the greeting: a pure function
//! of the negotiated protocol version onto capability flags, recomputed
//! every time a greeting is (re)processed.

mod error;
mod features;
mod session;

pub use error::SessionError;
pub use features::ProtocolFeatures;
pub use session::{
    AuthenticatedSession, Channel, ChatLine, PendingAgreement, Session, SessionPhase,
    User,
};

//! The typed command set.
//!
//! Each inbound type decodes its body against its own grammar arities and
//! carries the state mutation for that keyword in `execute`. Outbound
//! types serialize themselves; the connection actor adds the sequence
//! prefix and terminator. The set here covers every dispatch path the
//! engine has (greeting, login, agreement, chat, roster, keepalive,
//! redirect, upgrade) — the full lobby vocabulary registers additional
//! decoders through [`CommandRegistry::register`](crate::CommandRegistry).

pub mod inbound;
pub mod outbound;

//! Wire protocol for lobbylink.
//!
//! This crate defines the textual "language" spoken on a lobby connection:
//!
//! - **Framing** ([`LineFramer`]) — reassembles newline-terminated lines
//!   from arbitrarily split byte chunks.
//! - **Line structure** ([`RawLine`]) — the optional `#<sequence-id>`
//!   prefix, the uppercase keyword, and the remaining body.
//! - **Grammar** ([`ArgSpec`], [`decode_arguments`]) — the word/sentence
//!   argument grammar each command body is decoded against.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the engine
//! (typed commands). It knows nothing about connections, sessions, or what
//! any keyword means — it only splits bytes into lines and lines into
//! arguments.
//!
//! ```text
//! Transport (bytes) → Framer (lines) → RawLine (keyword + body)
//!                                    → Arguments (words / sentences)
//! ```

mod error;
mod framer;
mod grammar;
mod line;

pub use error::ProtocolError;
pub use framer::LineFramer;
pub use grammar::{decode_arguments, ArgSpec, Arguments};
pub use line::RawLine;

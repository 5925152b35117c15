//! The phase-dependent command registry.
//!
//! A registry maps an uppercase wire keyword to the decode function that
//! turns a body into a boxed [`InboundCommand`]. Two tables exist: the
//! minimal pre-greeting table (only the greeting keyword — nothing else
//! is meaningful before the protocol is identified) and the full table
//! swapped in wholesale once a greeting is parsed. A redirect reverts to
//! the minimal table until the new server's greeting arrives.

use std::collections::HashMap;

use lobbylink_protocol::ProtocolError;

use crate::command::InboundCommand;
use crate::commands::inbound::{
    Accepted, AddUser, Agreement, AgreementEnd, Clients, Denied, Join, Motd, Ok_,
    Pong, Redirect, RemoveUser, Said, Tasserver,
};

/// Decodes a command body into a boxed command.
pub type DecodeFn = fn(&str) -> Result<Box<dyn InboundCommand>, ProtocolError>;

/// A keyword → decoder table for one protocol phase.
pub struct CommandRegistry {
    table: HashMap<String, DecodeFn>,
}

impl CommandRegistry {
    /// The minimal table active before the server is identified.
    pub fn pre_greeting() -> Self {
        let mut registry = Self {
            table: HashMap::new(),
        };
        registry.register(Tasserver::KEYWORD, |body| {
            Ok(Box::new(Tasserver::decode(body)?))
        });
        registry
    }

    /// The full table active once a greeting negotiated the protocol.
    pub fn full() -> Self {
        let mut registry = Self::pre_greeting();
        registry.register(Accepted::KEYWORD, |body| {
            Ok(Box::new(Accepted::decode(body)?))
        });
        registry.register(Denied::KEYWORD, |body| {
            Ok(Box::new(Denied::decode(body)?))
        });
        registry.register(Agreement::KEYWORD, |body| {
            Ok(Box::new(Agreement::decode(body)?))
        });
        registry.register(AgreementEnd::KEYWORD, |body| {
            Ok(Box::new(AgreementEnd::decode(body)?))
        });
        registry.register(Motd::KEYWORD, |body| Ok(Box::new(Motd::decode(body)?)));
        registry.register(Pong::KEYWORD, |body| Ok(Box::new(Pong::decode(body)?)));
        registry.register(Ok_::KEYWORD, |body| Ok(Box::new(Ok_::decode(body)?)));
        registry.register(Redirect::KEYWORD, |body| {
            Ok(Box::new(Redirect::decode(body)?))
        });
        registry.register(Join::KEYWORD, |body| Ok(Box::new(Join::decode(body)?)));
        registry.register(Clients::KEYWORD, |body| {
            Ok(Box::new(Clients::decode(body)?))
        });
        registry.register(Said::KEYWORD, |body| Ok(Box::new(Said::decode(body)?)));
        registry.register(Said::KEYWORD_EX, |body| {
            Ok(Box::new(Said::decode_emote(body)?))
        });
        registry.register(AddUser::KEYWORD, |body| {
            Ok(Box::new(AddUser::decode(body)?))
        });
        registry.register(RemoveUser::KEYWORD, |body| {
            Ok(Box::new(RemoveUser::decode(body)?))
        });
        registry
    }

    /// Adds (or replaces) a decoder. External command modules extend the
    /// full table through this before handing the registry to the engine.
    pub fn register(&mut self, keyword: &str, decode: DecodeFn) {
        self.table.insert(keyword.to_ascii_uppercase(), decode);
    }

    /// Looks up `keyword` (case-insensitively) and decodes `body` with it.
    ///
    /// `None` means the keyword is unknown in this phase — the caller
    /// logs and drops the line.
    pub fn decode(
        &self,
        keyword: &str,
        body: &str,
    ) -> Option<Result<Box<dyn InboundCommand>, ProtocolError>> {
        let decode = self.table.get(&keyword.to_ascii_uppercase())?;
        Some(decode(body))
    }

    /// `true` when the keyword has a decoder in this phase.
    pub fn contains(&self, keyword: &str) -> bool {
        self.table.contains_key(&keyword.to_ascii_uppercase())
    }

    /// Registered keywords.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

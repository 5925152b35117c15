//! Inbound commands: decoded from the wire, executed against the session.

use std::any::Any;

use lobbylink_protocol::{decode_arguments, ArgSpec, ProtocolError};
use lobbylink_session::{Channel, ChatLine, ProtocolFeatures, User};
use tracing::{debug, warn};

use crate::command::{Effect, InboundCommand, SessionContext};
use crate::event::LobbyEvent;

/// Default lobby port used when a redirect omits one.
pub const DEFAULT_LOBBY_PORT: u16 = 8200;

/// The server greeting: `TASSERVER <protocol> <engine> <udp-port> <mode>`.
///
/// The only keyword the pre-greeting registry knows. Executing it swaps in
/// the full registry, derives the feature flags, and (when advertised)
/// kicks off the TLS upgrade negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tasserver {
    pub protocol_version: String,
    pub engine_version: String,
    pub udp_port: u16,
    pub server_mode: u32,
}

impl Tasserver {
    pub const KEYWORD: &'static str = "TASSERVER";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(4, 0))?;
        let [protocol_version, engine_version, udp_port, server_mode] =
            args.words.try_into().expect("arity checked by grammar");
        Ok(Self {
            protocol_version,
            engine_version,
            udp_port: udp_port.parse().map_err(|_| ProtocolError::InvalidArgument {
                name: "udp_port",
                value: udp_port.clone(),
            })?,
            server_mode: server_mode.parse().map_err(|_| {
                ProtocolError::InvalidArgument {
                    name: "server_mode",
                    value: server_mode.clone(),
                }
            })?,
        })
    }
}

impl InboundCommand for Tasserver {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        ctx.session.greeting_received();
        ctx.features = ProtocolFeatures::from_version(&self.protocol_version);
        ctx.push_effect(Effect::UseFullRegistry);
        // Sends buffered across an upgrade window are released by the
        // reprocessed greeting, not by the handshake finishing.
        ctx.push_effect(Effect::FlushSendBuffer);
        if ctx.features.tls_upgrade {
            ctx.push_effect(Effect::RequestTlsUpgrade);
        }
        ctx.emit(LobbyEvent::GreetingParsed {
            protocol_version: self.protocol_version.clone(),
            engine_version: self.engine_version.clone(),
            features: ctx.features,
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `ACCEPTED <username>` — login succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub username: String,
}

impl Accepted {
    pub const KEYWORD: &'static str = "ACCEPTED";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(1, 0))?;
        let [username] = args.words.try_into().expect("arity checked by grammar");
        Ok(Self { username })
    }
}

impl InboundCommand for Accepted {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.login_accepted(self.username.clone()) {
            Ok(()) => ctx.emit(LobbyEvent::LoginAccepted {
                username: self.username.clone(),
            }),
            Err(e) => warn!(username = %self.username, error = %e, "dropping ACCEPTED"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `DENIED <reason>` — login rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    pub reason: String,
}

impl Denied {
    pub const KEYWORD: &'static str = "DENIED";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(0, 1))?;
        let [reason] = args.sentences.try_into().expect("arity checked by grammar");
        Ok(Self { reason })
    }
}

impl InboundCommand for Denied {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.login_denied() {
            Ok(()) => ctx.emit(LobbyEvent::LoginDenied {
                reason: self.reason.clone(),
            }),
            Err(e) => warn!(error = %e, "dropping DENIED"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `AGREEMENT <line>` — one line of the agreement the server streams
/// before a first login may complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agreement {
    pub line: String,
}

impl Agreement {
    pub const KEYWORD: &'static str = "AGREEMENT";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        // Blank agreement lines are legal; the sentence is optional.
        let args =
            decode_arguments(body, ArgSpec::new(0, 0).with_optional_sentences(1))?;
        Ok(Self {
            line: args.optional_sentences.into_iter().next().unwrap_or_default(),
        })
    }
}

impl InboundCommand for Agreement {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        if let Err(e) = ctx.session.agreement_line(self.line.clone()) {
            warn!(error = %e, "dropping AGREEMENT line");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `AGREEMENTEND` — the agreement text is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementEnd;

impl AgreementEnd {
    pub const KEYWORD: &'static str = "AGREEMENTEND";

    pub fn decode(_body: &str) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}

impl InboundCommand for AgreementEnd {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.agreement_end() {
            Ok(pending) => {
                let text = pending.text();
                ctx.emit(LobbyEvent::AgreementReceived { text });
            }
            Err(e) => warn!(error = %e, "dropping AGREEMENTEND"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `MOTD <line>` — one message-of-the-day line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motd {
    pub line: String,
}

impl Motd {
    pub const KEYWORD: &'static str = "MOTD";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args =
            decode_arguments(body, ArgSpec::new(0, 0).with_optional_sentences(1))?;
        Ok(Self {
            line: args.optional_sentences.into_iter().next().unwrap_or_default(),
        })
    }
}

impl InboundCommand for Motd {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        ctx.emit(LobbyEvent::Motd {
            line: self.line.clone(),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `PONG` — heartbeat acknowledgment. The round trip is recorded by the
/// one-shot handler the heartbeat registered; execution itself has no
/// state to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong;

impl Pong {
    pub const KEYWORD: &'static str = "PONG";

    pub fn decode(_body: &str) -> Result<Self, ProtocolError> {
        Ok(Self)
    }
}

impl InboundCommand for Pong {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, _ctx: &mut SessionContext) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `OK` — generic acknowledgment. The engine cares about exactly one: the
/// acknowledgment of its upgrade request, which completes the TLS
/// handshake. The actor ignores the effect when no upgrade is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ok_ {
    /// What was acknowledged, when the server says (e.g. `cmd=STARTTLS`).
    pub of: Option<String>,
}

impl Ok_ {
    pub const KEYWORD: &'static str = "OK";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(0, 0).with_optional_words(1))?;
        Ok(Self {
            of: args.optional_words.into_iter().next(),
        })
    }
}

impl InboundCommand for Ok_ {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        ctx.push_effect(Effect::CompleteTlsUpgrade);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `REDIRECT <host> [port]` — the server moves this client elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub host: String,
    pub port: u16,
}

impl Redirect {
    pub const KEYWORD: &'static str = "REDIRECT";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(1, 0).with_optional_words(1))?;
        let [host] = args.words.try_into().expect("arity checked by grammar");
        let port = match args.optional_words.into_iter().next() {
            Some(raw) => raw.parse().map_err(|_| ProtocolError::InvalidArgument {
                name: "port",
                value: raw.clone(),
            })?,
            None => DEFAULT_LOBBY_PORT,
        };
        Ok(Self { host, port })
    }

    /// The `host:port` address to reconnect to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl InboundCommand for Redirect {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        // The engine emits RedirectStarted when it acts on the effect, so
        // that caller- and server-initiated redirects announce themselves
        // the same way (and exactly once).
        ctx.push_effect(Effect::Redirect { addr: self.addr() });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `JOIN <channel>` — the server confirmed a channel join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub channel: String,
}

impl Join {
    pub const KEYWORD: &'static str = "JOIN";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(1, 0))?;
        let [channel] = args.words.try_into().expect("arity checked by grammar");
        Ok(Self { channel })
    }
}

impl InboundCommand for Join {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.authenticated_mut() {
            Ok(auth) => {
                let own_name = auth.username.clone();
                let channel = auth.channels.entry(self.channel.clone()).or_insert_with(Channel::default);
                channel.members.insert(own_name);
                ctx.emit(LobbyEvent::ChannelJoined {
                    channel: self.channel.clone(),
                });
            }
            Err(e) => warn!(channel = %self.channel, error = %e, "dropping JOIN"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `CLIENTS <channel> <name name ...>` — the member list sent on join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clients {
    pub channel: String,
    pub members: Vec<String>,
}

impl Clients {
    pub const KEYWORD: &'static str = "CLIENTS";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(1, 1))?;
        let [channel] = args.words.try_into().expect("arity checked by grammar");
        let [list] = args.sentences.try_into().expect("arity checked by grammar");
        Ok(Self {
            channel,
            members: list.split_whitespace().map(str::to_owned).collect(),
        })
    }
}

impl InboundCommand for Clients {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.authenticated_mut() {
            Ok(auth) => {
                let channel =
                    auth.channels.entry(self.channel.clone()).or_insert_with(Channel::default);
                channel.members.extend(self.members.iter().cloned());
            }
            Err(e) => warn!(channel = %self.channel, error = %e, "dropping CLIENTS"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `SAID <channel> <author> <text>` / `SAIDEX` (emote variant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Said {
    pub channel: String,
    pub author: String,
    pub text: String,
    pub emote: bool,
}

impl Said {
    pub const KEYWORD: &'static str = "SAID";
    pub const KEYWORD_EX: &'static str = "SAIDEX";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        Self::decode_with(body, false)
    }

    pub fn decode_emote(body: &str) -> Result<Self, ProtocolError> {
        Self::decode_with(body, true)
    }

    fn decode_with(body: &str, emote: bool) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(2, 1))?;
        let [channel, author] = args.words.try_into().expect("arity checked by grammar");
        let [text] = args.sentences.try_into().expect("arity checked by grammar");
        Ok(Self {
            channel,
            author,
            text,
            emote,
        })
    }
}

impl InboundCommand for Said {
    fn keyword(&self) -> &'static str {
        if self.emote {
            Self::KEYWORD_EX
        } else {
            Self::KEYWORD
        }
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.authenticated_mut() {
            Ok(auth) => match auth.channels.get_mut(&self.channel) {
                Some(channel) => {
                    channel.history.push(ChatLine {
                        author: self.author.clone(),
                        text: self.text.clone(),
                        emote: self.emote,
                    });
                    ctx.emit(LobbyEvent::Said {
                        channel: self.channel.clone(),
                        author: self.author.clone(),
                        text: self.text.clone(),
                        emote: self.emote,
                    });
                }
                // Chat for a channel we never joined: stale server state,
                // not an error.
                None => debug!(channel = %self.channel, "chat for unjoined channel"),
            },
            Err(e) => warn!(channel = %self.channel, error = %e, "dropping SAID"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `ADDUSER <name> <country> [id]` — a user appeared on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddUser {
    pub name: String,
    pub country: String,
}

impl AddUser {
    pub const KEYWORD: &'static str = "ADDUSER";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(2, 0).with_optional_words(1))?;
        let [name, country] = args.words.try_into().expect("arity checked by grammar");
        Ok(Self { name, country })
    }
}

impl InboundCommand for AddUser {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.authenticated_mut() {
            Ok(auth) => {
                auth.users.insert(
                    self.name.clone(),
                    User {
                        name: self.name.clone(),
                        country: self.country.clone(),
                    },
                );
                ctx.emit(LobbyEvent::UserJoined {
                    name: self.name.clone(),
                    country: self.country.clone(),
                });
            }
            Err(e) => warn!(name = %self.name, error = %e, "dropping ADDUSER"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `REMOVEUSER <name>` — a user left the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveUser {
    pub name: String,
}

impl RemoveUser {
    pub const KEYWORD: &'static str = "REMOVEUSER";

    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        let args = decode_arguments(body, ArgSpec::new(1, 0))?;
        let [name] = args.words.try_into().expect("arity checked by grammar");
        Ok(Self { name })
    }
}

impl InboundCommand for RemoveUser {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn execute(&self, ctx: &mut SessionContext) {
        match ctx.session.authenticated_mut() {
            Ok(auth) => {
                auth.users.remove(&self.name);
                ctx.emit(LobbyEvent::UserLeft {
                    name: self.name.clone(),
                });
            }
            Err(e) => warn!(name = %self.name, error = %e, "dropping REMOVEUSER"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use lobbylink_session::SessionPhase;

    use super::*;

    // -- Decoding ---------------------------------------------------------

    #[test]
    fn test_decode_greeting() {
        let cmd = Tasserver::decode("0.38 104 8201 0").unwrap();
        assert_eq!(cmd.protocol_version, "0.38");
        assert_eq!(cmd.engine_version, "104");
        assert_eq!(cmd.udp_port, 8201);
        assert_eq!(cmd.server_mode, 0);
    }

    #[test]
    fn test_decode_greeting_bad_port() {
        let err = Tasserver::decode("0.38 104 eight 0").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidArgument {
                name: "udp_port",
                value: "eight".into()
            }
        );
    }

    #[test]
    fn test_decode_greeting_too_few_words() {
        assert!(matches!(
            Tasserver::decode("0.38 104").unwrap_err(),
            ProtocolError::TooFewWords { expected: 4, got: 2 }
        ));
    }

    #[test]
    fn test_decode_said_keeps_spaces_in_text() {
        let cmd = Said::decode("room1 username\tHello there").unwrap();
        assert_eq!(cmd.channel, "room1");
        assert_eq!(cmd.author, "username");
        assert_eq!(cmd.text, "Hello there");
        assert!(!cmd.emote);
    }

    #[test]
    fn test_decode_redirect_with_and_without_port() {
        let cmd = Redirect::decode("10.0.0.7 8452").unwrap();
        assert_eq!(cmd.addr(), "10.0.0.7:8452");

        let cmd = Redirect::decode("backup.example.org").unwrap();
        assert_eq!(cmd.addr(), "backup.example.org:8200");
    }

    #[test]
    fn test_decode_clients_splits_member_list() {
        let cmd = Clients::decode("main\talice bob carol").unwrap();
        assert_eq!(cmd.channel, "main");
        assert_eq!(cmd.members, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_decode_agreement_allows_blank_line() {
        assert_eq!(Agreement::decode("").unwrap().line, "");
        assert_eq!(Agreement::decode("Be nice.").unwrap().line, "Be nice.");
    }

    #[test]
    fn test_decode_ok_with_detail() {
        assert_eq!(Ok_::decode("cmd=STARTTLS").unwrap().of.as_deref(), Some("cmd=STARTTLS"));
        assert_eq!(Ok_::decode("").unwrap().of, None);
    }

    // -- Execution --------------------------------------------------------

    fn ctx_unauthenticated() -> SessionContext {
        let mut ctx = SessionContext::new();
        ctx.session.greeting_received();
        ctx
    }

    fn ctx_authenticated(name: &str) -> SessionContext {
        let mut ctx = ctx_unauthenticated();
        ctx.session.login_accepted(name.into()).unwrap();
        ctx
    }

    #[test]
    fn test_greeting_execute_swaps_registry_and_derives_features() {
        let mut ctx = SessionContext::new();
        Tasserver::decode("0.38 104 8201 0").unwrap().execute(&mut ctx);

        assert_eq!(ctx.session.phase(), SessionPhase::Unauthenticated);
        assert!(ctx.features.tls_upgrade);
        let effects = ctx.effects();
        assert!(matches!(effects[0], Effect::UseFullRegistry));
        assert!(matches!(effects[1], Effect::FlushSendBuffer));
        assert!(matches!(effects[2], Effect::RequestTlsUpgrade));
        assert!(matches!(
            effects[3],
            Effect::Emit(LobbyEvent::GreetingParsed { .. })
        ));
    }

    #[test]
    fn test_old_greeting_does_not_request_upgrade() {
        let mut ctx = SessionContext::new();
        Tasserver::decode("0.36 104 8201 0").unwrap().execute(&mut ctx);
        assert!(!ctx.features.tls_upgrade);
        assert!(!ctx
            .effects()
            .iter()
            .any(|e| matches!(e, Effect::RequestTlsUpgrade)));
    }

    #[test]
    fn test_accepted_transitions_to_authenticated() {
        let mut ctx = ctx_unauthenticated();
        Accepted {
            username: "bob".into(),
        }
        .execute(&mut ctx);

        assert_eq!(ctx.session.phase(), SessionPhase::Authenticated);
        assert!(matches!(
            ctx.effects()[0],
            Effect::Emit(LobbyEvent::LoginAccepted { .. })
        ));
    }

    #[test]
    fn test_accepted_before_greeting_is_dropped() {
        let mut ctx = SessionContext::new();
        Accepted {
            username: "bob".into(),
        }
        .execute(&mut ctx);
        assert_eq!(ctx.session.phase(), SessionPhase::None);
        assert!(ctx.effects().is_empty());
    }

    #[test]
    fn test_denied_reverts_to_unauthenticated() {
        let mut ctx = ctx_unauthenticated();
        ctx.session.agreement_line("terms".into()).unwrap();
        Denied {
            reason: "Bad password".into(),
        }
        .execute(&mut ctx);
        assert_eq!(ctx.session.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn test_agreement_flow_emits_full_text() {
        let mut ctx = ctx_unauthenticated();
        Agreement {
            line: "Terms:".into(),
        }
        .execute(&mut ctx);
        Agreement {
            line: "be nice".into(),
        }
        .execute(&mut ctx);
        AgreementEnd.execute(&mut ctx);

        assert_eq!(ctx.session.phase(), SessionPhase::PendingAgreement);
        assert!(ctx.effects().iter().any(|e| matches!(
            e,
            Effect::Emit(LobbyEvent::AgreementReceived { text }) if text == "Terms:\nbe nice"
        )));
    }

    #[test]
    fn test_join_then_said_records_history() {
        let mut ctx = ctx_authenticated("bob");
        Join {
            channel: "main".into(),
        }
        .execute(&mut ctx);
        Said::decode("main alice\thi all").unwrap().execute(&mut ctx);

        let auth = ctx.session.authenticated().unwrap();
        let channel = &auth.channels["main"];
        assert!(channel.members.contains("bob"));
        assert_eq!(channel.history.len(), 1);
        assert_eq!(channel.history[0].author, "alice");
        assert_eq!(channel.history[0].text, "hi all");
    }

    #[test]
    fn test_said_for_unjoined_channel_is_ignored() {
        let mut ctx = ctx_authenticated("bob");
        Said::decode("ghost alice\thi").unwrap().execute(&mut ctx);
        assert!(ctx.effects().is_empty());
    }

    #[test]
    fn test_roster_add_and_remove() {
        let mut ctx = ctx_authenticated("bob");
        AddUser::decode("alice SE 42").unwrap().execute(&mut ctx);
        assert!(ctx.session.authenticated().unwrap().users.contains_key("alice"));

        RemoveUser::decode("alice").unwrap().execute(&mut ctx);
        assert!(ctx.session.authenticated().unwrap().users.is_empty());
    }

    #[test]
    fn test_ok_requests_upgrade_completion() {
        let mut ctx = ctx_unauthenticated();
        Ok_ { of: None }.execute(&mut ctx);
        assert!(matches!(ctx.effects()[0], Effect::CompleteTlsUpgrade));
    }

    #[test]
    fn test_redirect_queues_transport_swap() {
        let mut ctx = ctx_unauthenticated();
        Redirect::decode("10.0.0.7 8452").unwrap().execute(&mut ctx);
        // No Emit here: the engine announces the redirect itself, so the
        // event reaches the caller exactly once.
        assert_eq!(ctx.effects().len(), 1);
        assert!(matches!(
            &ctx.effects()[0],
            Effect::Redirect { addr } if addr == "10.0.0.7:8452"
        ));
    }
}

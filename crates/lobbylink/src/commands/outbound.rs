//! Outbound commands: serialized by the engine, answered by the server.

use crate::command::OutboundCommand;

/// The name and version this client reports in its login.
const CLIENT_IDENT: &str = concat!("lobbylink ", env!("CARGO_PKG_VERSION"));

/// `LOGIN <user> <password> <cpu> <ip> <client ident>`.
///
/// The password is sent as given; hashing/storage is the caller's concern
/// (credentials never persist inside the engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub username: String,
    pub password: String,
}

impl Login {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl OutboundCommand for Login {
    fn keyword(&self) -> &'static str {
        "LOGIN"
    }

    fn encode(&self) -> String {
        // `0` cpu and `*` local-ip: the server fills both in server-side.
        format!("LOGIN {} {} 0 * {CLIENT_IDENT}", self.username, self.password)
    }
}

/// `PING` — the keepalive heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping;

impl OutboundCommand for Ping {
    fn keyword(&self) -> &'static str {
        "PING"
    }

    fn encode(&self) -> String {
        "PING".to_owned()
    }
}

/// `EXIT [reason]` — polite goodbye before closing the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exit {
    pub reason: Option<String>,
}

impl OutboundCommand for Exit {
    fn keyword(&self) -> &'static str {
        "EXIT"
    }

    fn encode(&self) -> String {
        match &self.reason {
            Some(reason) => format!("EXIT {reason}"),
            None => "EXIT".to_owned(),
        }
    }
}

/// `STLS` — request the mid-stream TLS upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTls;

impl OutboundCommand for StartTls {
    fn keyword(&self) -> &'static str {
        "STLS"
    }

    fn encode(&self) -> String {
        "STLS".to_owned()
    }
}

/// `JOIN <channel>` — ask to join a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinChannel {
    pub channel: String,
}

impl JoinChannel {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

impl OutboundCommand for JoinChannel {
    fn keyword(&self) -> &'static str {
        "JOIN"
    }

    fn encode(&self) -> String {
        format!("JOIN {}", self.channel)
    }
}

/// `SAY <channel> <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Say {
    pub channel: String,
    pub message: String,
}

impl Say {
    pub fn new(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

impl OutboundCommand for Say {
    fn keyword(&self) -> &'static str {
        "SAY"
    }

    fn encode(&self) -> String {
        format!("SAY {} {}", self.channel, self.message)
    }
}

/// `CONFIRMAGREEMENT [code]` — accept the agreement; carries the email
/// verification code when the server negotiated that capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmAgreement {
    pub verification_code: Option<String>,
}

impl OutboundCommand for ConfirmAgreement {
    fn keyword(&self) -> &'static str {
        "CONFIRMAGREEMENT"
    }

    fn encode(&self) -> String {
        match &self.verification_code {
            Some(code) => format!("CONFIRMAGREEMENT {code}"),
            None => "CONFIRMAGREEMENT".to_owned(),
        }
    }
}

/// `MYBATTLESTATUS <status> <color>` — battle-state bitfield update.
/// Included to exercise plain fire-and-forget sends; the bitfield's
/// meaning belongs to the battle layer, not the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MyBattleStatus {
    pub battle_status: u32,
    pub team_color: u32,
}

impl OutboundCommand for MyBattleStatus {
    fn keyword(&self) -> &'static str {
        "MYBATTLESTATUS"
    }

    fn encode(&self) -> String {
        format!("MYBATTLESTATUS {} {}", self.battle_status, self.team_color)
    }
}

//! Capability flags derived from the negotiated protocol version.

/// What the negotiated protocol version says the server can do.
///
/// Derived once per greeting by [`ProtocolFeatures::from_version`]; a
/// reconnect or redirect reprocesses the new greeting and recomputes the
/// flags from scratch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolFeatures {
    /// The server accepts the `STLS` upgrade request (protocol ≥ 0.37).
    pub tls_upgrade: bool,
    /// Registration requires an email verification code (protocol ≥ 0.38).
    pub email_verification: bool,
}

impl ProtocolFeatures {
    /// Derives capability flags from a protocol version string such as
    /// `"0.38"` or `"0.36.1"`.
    ///
    /// An unparseable version yields all-false flags: an unknown server is
    /// assumed to support nothing optional.
    pub fn from_version(version: &str) -> Self {
        let Some((major, minor)) = parse_version(version) else {
            tracing::warn!(version, "unparseable protocol version, assuming no optional features");
            return Self::default();
        };
        Self {
            tls_upgrade: (major, minor) >= (0, 37),
            email_verification: (major, minor) >= (0, 38),
        }
    }
}

/// Parses the `major.minor` prefix of a version string. Trailing
/// components (`0.36.1`) are ignored.
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

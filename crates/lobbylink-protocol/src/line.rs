//! Raw line structure: sequence prefix, keyword, body.
//!
//! A framed line looks like `[#<sequence-id> ]<KEYWORD>[ <body>]`. This
//! module splits those three parts without interpreting the body — the
//! keyword selects an [`ArgSpec`](crate::ArgSpec) later, at the registry.

use crate::ProtocolError;

/// A framed line split into its structural parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// The echoed sequence id, when the line carried a `#<n>` prefix.
    pub seq: Option<u64>,
    /// The command keyword, uppercased for registry lookup.
    pub keyword: String,
    /// Everything after the keyword, untouched.
    pub body: String,
}

impl RawLine {
    /// Parses a complete (already framed) line.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedSequenceId`] when a `#` prefix is present
    /// but not followed by an integer, [`ProtocolError::MissingKeyword`]
    /// when nothing follows the prefix.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let seq = if let Some(tagged) = rest.strip_prefix('#') {
            let (token, after) = match tagged.split_once(' ') {
                Some((token, after)) => (token, after),
                None => (tagged, ""),
            };
            let seq = token
                .parse::<u64>()
                .map_err(|_| ProtocolError::MalformedSequenceId(format!("#{token}")))?;
            rest = after;
            Some(seq)
        } else {
            None
        };

        if rest.is_empty() {
            return Err(ProtocolError::MissingKeyword);
        }

        let (keyword, body) = match rest.find([' ', '\t']) {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };

        Ok(Self {
            seq,
            keyword: keyword.to_ascii_uppercase(),
            body: body.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_sequence_prefix() {
        let line = RawLine::parse("#3 SAID room1 username\tHello there").unwrap();
        assert_eq!(line.seq, Some(3));
        assert_eq!(line.keyword, "SAID");
        assert_eq!(line.body, "room1 username\tHello there");
    }

    #[test]
    fn test_parse_without_sequence_prefix() {
        let line = RawLine::parse("TASSERVER 0.38 104 8201 0").unwrap();
        assert_eq!(line.seq, None);
        assert_eq!(line.keyword, "TASSERVER");
        assert_eq!(line.body, "0.38 104 8201 0");
    }

    #[test]
    fn test_parse_bare_keyword() {
        let line = RawLine::parse("PONG").unwrap();
        assert_eq!(line.seq, None);
        assert_eq!(line.keyword, "PONG");
        assert_eq!(line.body, "");
    }

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        let line = RawLine::parse("pong").unwrap();
        assert_eq!(line.keyword, "PONG");
    }

    #[test]
    fn test_malformed_sequence_id() {
        let err = RawLine::parse("#abc PONG").unwrap_err();
        assert_eq!(err, ProtocolError::MalformedSequenceId("#abc".into()));
    }

    #[test]
    fn test_prefix_without_keyword() {
        let err = RawLine::parse("#7").unwrap_err();
        assert_eq!(err, ProtocolError::MissingKeyword);
    }

    #[test]
    fn test_sequence_zero_is_valid() {
        let line = RawLine::parse("#0 MYBATTLESTATUS 67108866 255").unwrap();
        assert_eq!(line.seq, Some(0));
        assert_eq!(line.keyword, "MYBATTLESTATUS");
        assert_eq!(line.body, "67108866 255");
    }
}

//! Error types for the protocol layer.
//!
//! Each crate in lobbylink defines its own error enum. A `ProtocolError`
//! always means a single line was malformed — framing itself never fails,
//! and the engine recovers from every variant here by logging and dropping
//! the offending line.

/// Errors that can occur while decoding a single protocol line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The body ran out of tokens before all mandatory words were read.
    #[error("too few words: expected {expected}, got {got}")]
    TooFewWords {
        /// Mandatory word count the command requires.
        expected: usize,
        /// Words actually present in the body.
        got: usize,
    },

    /// The body ran out of tokens before all mandatory sentences were read.
    #[error("too few sentences: expected {expected}, got {got}")]
    TooFewSentences {
        /// Mandatory sentence count the command requires.
        expected: usize,
        /// Sentences actually present in the body.
        got: usize,
    },

    /// A token was present but could not be interpreted (e.g. a port
    /// argument that is not a number).
    #[error("invalid argument {name}: {value:?}")]
    InvalidArgument {
        /// Which argument, by the command's name for it.
        name: &'static str,
        /// The offending token.
        value: String,
    },

    /// A `#`-prefixed token was present but not a valid sequence id.
    #[error("malformed sequence id: {0:?}")]
    MalformedSequenceId(String),

    /// The line contained a sequence prefix but no keyword after it.
    #[error("missing keyword")]
    MissingKeyword,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages_name_the_shortfall() {
        let err = ProtocolError::TooFewWords {
            expected: 2,
            got: 1,
        };
        assert_eq!(err.to_string(), "too few words: expected 2, got 1");

        let err = ProtocolError::MalformedSequenceId("#x1".into());
        assert!(err.to_string().contains("#x1"));
    }
}

//! The word/sentence argument grammar.
//!
//! Every command body is an ordered run of tokens: mandatory *words*
//! (space-delimited), then mandatory *sentences* (tab-delimited, may embed
//! spaces), then optional words, then optional sentences. The order is
//! fixed; only the arities differ per command. The final token of the body
//! absorbs any embedded delimiters that are not the next expected one —
//! which is how a chat sentence keeps its spaces, and how a trailing
//! sentence keeps even literal tabs when nothing may follow it.

use crate::ProtocolError;

/// Per-command arities for [`decode_arguments`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArgSpec {
    /// Mandatory space-delimited words. A shortfall is an error.
    pub words: usize,
    /// Mandatory tab-delimited sentences. A shortfall is an error.
    pub sentences: usize,
    /// Optional words read after the mandatory sentences. Absent is fine.
    pub optional_words: usize,
    /// Optional sentences read last. Absent is fine.
    pub optional_sentences: usize,
}

impl ArgSpec {
    /// Spec with only mandatory arities.
    pub const fn new(words: usize, sentences: usize) -> Self {
        Self {
            words,
            sentences,
            optional_words: 0,
            optional_sentences: 0,
        }
    }

    /// Adds optional word slots.
    pub const fn with_optional_words(mut self, n: usize) -> Self {
        self.optional_words = n;
        self
    }

    /// Adds optional sentence slots.
    pub const fn with_optional_sentences(mut self, n: usize) -> Self {
        self.optional_sentences = n;
        self
    }
}

/// The decoded argument lists, in grammar order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    pub words: Vec<String>,
    pub sentences: Vec<String>,
    pub optional_words: Vec<String>,
    pub optional_sentences: Vec<String>,
}

/// Decodes a command body against the given arities.
///
/// # Errors
///
/// [`ProtocolError::TooFewWords`] / [`ProtocolError::TooFewSentences`]
/// when the body runs out before the mandatory counts are satisfied.
/// Missing optional tokens are not an error.
pub fn decode_arguments(body: &str, spec: ArgSpec) -> Result<Arguments, ProtocolError> {
    let mut rest = body;
    let mut args = Arguments::default();

    for got in 0..spec.words {
        if rest.is_empty() {
            return Err(ProtocolError::TooFewWords {
                expected: spec.words,
                got,
            });
        }
        args.words.push(next_word(&mut rest));
    }

    let trailing_after_sentences =
        spec.optional_words == 0 && spec.optional_sentences == 0;
    for got in 0..spec.sentences {
        if rest.is_empty() {
            return Err(ProtocolError::TooFewSentences {
                expected: spec.sentences,
                got,
            });
        }
        let is_last = got + 1 == spec.sentences && trailing_after_sentences;
        args.sentences.push(next_sentence(&mut rest, is_last));
    }

    for _ in 0..spec.optional_words {
        if rest.is_empty() {
            break;
        }
        args.optional_words.push(next_word(&mut rest));
    }

    for taken in 0..spec.optional_sentences {
        if rest.is_empty() {
            break;
        }
        let is_last = taken + 1 == spec.optional_sentences;
        args.optional_sentences.push(next_sentence(&mut rest, is_last));
    }

    Ok(args)
}

/// Takes the next word: everything up to the first space or tab. The
/// delimiter is consumed. A word that reaches the end of the body takes
/// all of it.
fn next_word(rest: &mut &str) -> String {
    match rest.find([' ', '\t']) {
        Some(pos) => {
            let word = rest[..pos].to_owned();
            *rest = &rest[pos + 1..];
            word
        }
        None => {
            let word = (*rest).to_owned();
            *rest = "";
            word
        }
    }
}

/// Takes the next sentence: everything up to the next tab, or — when this
/// is the final expected token — the whole remainder, embedded tabs
/// included.
fn next_sentence(rest: &mut &str, is_last: bool) -> String {
    if is_last {
        let sentence = (*rest).to_owned();
        *rest = "";
        return sentence;
    }
    match rest.find('\t') {
        Some(pos) => {
            let sentence = rest[..pos].to_owned();
            *rest = &rest[pos + 1..];
            sentence
        }
        None => {
            let sentence = (*rest).to_owned();
            *rest = "";
            sentence
        }
    }
}

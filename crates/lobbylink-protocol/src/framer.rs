//! Incremental line framing over a byte stream.
//!
//! TCP delivers bytes in arbitrary chunks: one read may carry half a line,
//! three lines, or a line and a half. [`LineFramer`] owns the carry-over
//! buffer so that the engine sees only complete lines, in order, no matter
//! where the chunk boundaries fall.

/// Reassembles newline-terminated lines from arbitrary byte chunks.
///
/// Feed every received chunk to [`push`](Self::push); it returns all lines
/// completed by that chunk and retains the trailing fragment (if any) for
/// the next call. Empty lines are discarded. Lines never block on a later
/// chunk: every line boundary already in the buffer yields immediately.
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Incomplete trailing fragment carried between reads.
    buf: Vec<u8>,
}

impl LineFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completes.
    ///
    /// A trailing `\r` (from `\r\n` peers) is stripped. Bytes that are not
    /// valid UTF-8 are replaced rather than dropped — a garbled line still
    /// reaches the dispatcher, which logs and discards it there.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the '\n' itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Number of buffered bytes awaiting a line terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Discards any buffered fragment. Called when the transport is
    /// replaced: a half-line from the old stream must not prefix the first
    /// line of the new one.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

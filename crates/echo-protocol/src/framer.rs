//! Newline framing over an arbitrary chunked byte stream.
//!
//! Bytes are pushed in whatever chunks the socket hands back; complete
//! lines (terminator included) are popped one at a time. Whatever is left
//! when the stream ends is handed back by [`LineFramer::finish`].
//!
//! The unterminated tail is capped: once more than `max_line_len` bytes are
//! pending after all complete lines have been popped, [`LineFramer::overflowed`]
//! reports it and the caller is expected to give up on the stream.

use bytes::{Bytes, BytesMut};

use crate::{DEFAULT_MAX_LINE_LEN, LINE_TERMINATOR};

/// Accumulates raw bytes and splits them into `\n`-terminated lines.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    max_line_len: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_line_len,
        }
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete line, including its terminator.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let newline_pos = self.buffer.iter().position(|&b| b == LINE_TERMINATOR)?;
        Some(self.buffer.split_to(newline_pos + 1).freeze())
    }

    /// Take the trailing partial line left over at end-of-stream.
    ///
    /// Returns `None` when nothing is pending.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.buffer.split().freeze())
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// The unterminated tail is longer than `max_line_len`.
    ///
    /// Only meaningful after `next_line` has returned `None`.
    pub fn overflowed(&self) -> bool {
        self.buffer.len() > self.max_line_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_lines_from_one_chunk() {
        let mut framer = LineFramer::new();
        framer.push(b"one\ntwo\nthr");

        assert_eq!(framer.next_line().as_deref(), Some(&b"one\n"[..]));
        assert_eq!(framer.next_line().as_deref(), Some(&b"two\n"[..]));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.pending(), 3);
    }

    #[test]
    fn joins_a_line_split_across_chunks() {
        let mut framer = LineFramer::new();
        framer.push(b"hel");
        assert_eq!(framer.next_line(), None);

        framer.push(b"lo\n");
        assert_eq!(framer.next_line().as_deref(), Some(&b"hello\n"[..]));
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn bare_terminator_is_an_empty_line() {
        let mut framer = LineFramer::new();
        framer.push(b"\n\n");

        assert_eq!(framer.next_line().as_deref(), Some(&b"\n"[..]));
        assert_eq!(framer.next_line().as_deref(), Some(&b"\n"[..]));
        assert_eq!(framer.next_line(), None);
    }

    #[test]
    fn finish_returns_partial_tail_once() {
        let mut framer = LineFramer::new();
        framer.push(b"done\ntail");
        assert_eq!(framer.next_line().as_deref(), Some(&b"done\n"[..]));

        assert_eq!(framer.finish().as_deref(), Some(&b"tail"[..]));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn long_unterminated_tail_overflows() {
        let mut framer = LineFramer::with_max_line_len(8);
        framer.push(b"12345678");
        assert!(!framer.overflowed());

        framer.push(b"9");
        assert_eq!(framer.next_line(), None);
        assert!(framer.overflowed());
    }

    #[test]
    fn popping_lines_clears_overflow() {
        let mut framer = LineFramer::with_max_line_len(4);
        framer.push(b"abc\nde");
        framer.push(b"f\ngh");

        while framer.next_line().is_some() {}
        assert!(!framer.overflowed());
        assert_eq!(framer.pending(), 2);
    }

    #[test]
    fn finish_on_empty_buffer_is_none() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.finish(), None);
    }
}

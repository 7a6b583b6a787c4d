//! The double-echo transformation.
//!
//! An inbound line `L` (with at most one trailing `\n` removed) becomes
//! `L + L + "\n"` on the way out.

use bytes::{BufMut, Bytes, BytesMut};

use crate::LINE_TERMINATOR;

/// Strip exactly one trailing terminator, if present.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((&LINE_TERMINATOR, content)) => content,
        _ => line,
    }
}

/// Build the outbound payload for one inbound line.
pub fn double_echo(line: &[u8]) -> Bytes {
    let content = strip_terminator(line);
    let mut payload = BytesMut::with_capacity(content.len() * 2 + 1);
    payload.put_slice(content);
    payload.put_slice(content);
    payload.put_u8(LINE_TERMINATOR);
    payload.freeze()
}

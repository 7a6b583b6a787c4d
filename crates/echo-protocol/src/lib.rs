//! echo-protocol
//!
//! Wire format for the multi-echo server:
//! - newline-delimited framing of an inbound byte stream
//! - the double-echo transformation applied before fan-out

pub mod framer;
pub mod transform;

pub use framer::LineFramer;
pub use transform::{double_echo, strip_terminator};

/// The only line terminator the protocol knows about.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Unterminated bytes a framer holds before reporting overflow.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

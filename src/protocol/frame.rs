//! Command line encoding and reply accumulation.
//!
//! The link has no framing or length prefix:
//! ```text
//! host -> module   AT+QISTATE=1,0\r\n
//! module -> host   \r\n+QISTATE: 0,"TCP",...\r\n\r\nOK\r\n
//! ```
//! A reply is recognised by content only, so the driver keeps every receive event
//! since the last command in a [`ReplyBuffer`] and searches it for markers.

use std::fmt;
use std::io::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::command::LINE_TERMINATOR;

/// Encodes a command into a CR+LF terminated line.
#[must_use]
pub fn encode(command: impl fmt::Display) -> Bytes {
    let mut writer = BytesMut::with_capacity(64).writer();
    // writing into BytesMut cannot fail
    let _ = write!(writer, "{command}");
    let mut buf = writer.into_inner();
    buf.put_slice(LINE_TERMINATOR);
    buf.freeze()
}

/// Finds the first occurrence of `needle` in `haystack`.
#[must_use]
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Returns true if `needle` occurs in `haystack`.
#[must_use]
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Bytes received since the last command was sent.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    buffer: BytesMut,
}

impl ReplyBuffer {
    /// Creates an empty reply buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Appends one receive event.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns true if the accumulated reply contains `marker`.
    #[must_use]
    pub fn contains(&self, marker: &str) -> bool {
        contains(&self.buffer, marker.as_bytes())
    }

    /// Index of the first of `markers` present in the reply.
    #[must_use]
    pub fn find_any(&self, markers: &[&str]) -> Option<usize> {
        markers.iter().position(|marker| self.contains(marker))
    }

    /// The accumulated reply.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Lossy text view of the reply, for logging and text parsers.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

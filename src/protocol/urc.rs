//! Unsolicited result codes (URCs) and the keyword scanner.
//!
//! Socket notifications arrive as `+QIURC: "<keyword>",...` lines at any time,
//! including in the middle of a command reply. The scanner finds every keyword
//! occurrence in one receive event and turns each into a [`RawEvent`] whose
//! payload is the rest of the event from the keyword onwards.

use std::fmt;

use bytes::Bytes;

use crate::protocol::command::MAX_PAYLOAD;
use crate::protocol::frame::find;

/// Notification kinds known to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrcKind {
    /// A connection was closed by the remote end.
    Closed,
    /// Data is waiting to be read with `AT+QIRD`.
    Recv,
    /// A listener rejected a client because every connection slot is in use.
    IncomingFull,
    /// A client connected to a listener.
    Incoming,
    /// The network deactivated a PDP context.
    PdpDeactivated,
    /// The ring-indicator line forced the module out of transparent mode.
    ExitTransparentMode,
    /// The transparent-mode connection lost its carrier.
    NoCarrier,
}

impl UrcKind {
    /// Kinds found by the keyword scanner, in scan order.
    pub const SCANNED: [Self; 5] = [
        Self::Incoming,
        Self::Recv,
        Self::Closed,
        Self::IncomingFull,
        Self::PdpDeactivated,
    ];

    /// Keyword that identifies this kind in a receive event.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Recv => "recv",
            Self::IncomingFull => "incoming full",
            Self::Incoming => "incoming",
            Self::PdpDeactivated => "pdpdeact",
            Self::ExitTransparentMode => "mainRI",
            Self::NoCarrier => "no carrier",
        }
    }

    /// Returns true for kinds produced by the driver rather than the module.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::ExitTransparentMode | Self::NoCarrier)
    }
}

impl fmt::Display for UrcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A detected notification, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Notification kind.
    pub kind: UrcKind,
    /// Receive-event tail starting at the keyword, at most [`MAX_PAYLOAD`] bytes.
    pub payload: Bytes,
}

impl RawEvent {
    /// Creates a raw event, truncating the payload to [`MAX_PAYLOAD`] bytes.
    #[must_use]
    pub fn new(kind: UrcKind, mut payload: Bytes) -> Self {
        payload.truncate(MAX_PAYLOAD);
        Self { kind, payload }
    }

    /// Synthetic event carrying only its keyword.
    #[must_use]
    pub fn synthetic(kind: UrcKind) -> Self {
        Self {
            kind,
            payload: Bytes::from_static(kind.keyword().as_bytes()),
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_synthetic() {
            return write!(f, "{}", self.kind);
        }
        write!(
            f,
            "{} ({} bytes): {:?}",
            self.kind,
            self.payload.len(),
            String::from_utf8_lossy(&self.payload)
        )
    }
}

/// Scans one receive event for notification keywords.
///
/// Keywords are tried in [`UrcKind::SCANNED`] order and every occurrence yields
/// its own event. An `incoming` that is the start of `incoming full` is only
/// reported as [`UrcKind::IncomingFull`].
#[must_use]
pub fn scan(data: &Bytes) -> Vec<RawEvent> {
    let mut events = Vec::new();

    for kind in UrcKind::SCANNED {
        let keyword = kind.keyword().as_bytes();
        let mut offset = 0;

        while let Some(pos) = find(&data[offset..], keyword) {
            let start = offset + pos;
            offset = start + keyword.len();

            if kind == UrcKind::Incoming
                && data[start..].starts_with(UrcKind::IncomingFull.keyword().as_bytes())
            {
                continue;
            }

            events.push(RawEvent::new(kind, data.slice(start..)));
        }
    }

    events
}

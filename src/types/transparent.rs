//! Transparent-mode state shared between interrupt and main context.

use crate::types::ids::ConnectId;

/// Whether the module currently pipes bytes transparently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransparentStatus {
    /// Replies and notifications are framed as AT lines (buffer-access mode).
    #[default]
    Inactive,
    /// Bytes are passed through as an opaque stream.
    Active,
}

/// Carrier-loss flag of the last transparent-mode connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Carrier {
    /// No carrier loss has been observed since transparent mode was entered.
    #[default]
    Present,
    /// The remote end disconnected (`NO CARRIER` or a `closed` notification).
    Lost,
}

/// Snapshot of the transparent-mode state machine.
///
/// `connect_id` is `None` until transparent mode has been entered once. It keeps
/// naming the last connection after the transition back to
/// [`TransparentStatus::Inactive`], so the driver can decide whether to re-enter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransparentState {
    /// Current mode.
    pub status: TransparentStatus,
    /// Carrier-loss flag.
    pub carrier: Carrier,
    /// Connection that was last switched to transparent mode.
    pub connect_id: Option<ConnectId>,
}

impl TransparentState {
    /// Returns true while the byte pipe is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TransparentStatus::Active
    }

    /// State after a successful switch to transparent mode on `connect_id`.
    #[must_use]
    pub const fn entered(connect_id: ConnectId) -> Self {
        Self {
            status: TransparentStatus::Active,
            carrier: Carrier::Present,
            connect_id: Some(connect_id),
        }
    }

    /// Same connection, now inactive, carrier flag preserved.
    #[must_use]
    pub const fn exited(self) -> Self {
        Self {
            status: TransparentStatus::Inactive,
            ..self
        }
    }

    /// Same connection, now inactive, carrier marked as lost.
    #[must_use]
    pub const fn carrier_lost(self) -> Self {
        Self {
            status: TransparentStatus::Inactive,
            carrier: Carrier::Lost,
            connect_id: self.connect_id,
        }
    }
}

//! Notification pipeline.
//!
//! Receive events are classified in interrupt context. Carrier loss and the
//! ring-indicator line are handled inline; notification keywords become
//! [`RawEvent`]s that a [`ReceiveHandler`] queues by default. The main loop calls
//! [`Modem::handle_events`] to drain the queue one entry at a time, parse it
//! into an [`Event`] and dispatch it to an [`EventHandler`].

pub mod queue;

use bytes::Bytes;

use crate::client::{Interrupts, Modem};
use crate::protocol::urc::{RawEvent, UrcKind};
use crate::transport::Board;
use crate::types::{Carrier, ConnectId, ContextId};

pub use queue::{DEFAULT_CAPACITY, EventQueue, QueueItem};

/// A parsed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The remote end closed `connect_id`.
    Closed { connect_id: ConnectId },
    /// A client connected to the listener `server_id` and was given `connect_id`.
    Incoming {
        connect_id: ConnectId,
        server_id: ConnectId,
    },
    /// Data read from `connect_id` after a `recv` notification.
    Recv { connect_id: ConnectId, data: Bytes },
    /// A client was rejected because every connection slot is in use.
    IncomingFull,
    /// The network deactivated `context_id`.
    PdpDeactivated { context_id: ContextId },
}

impl Event {
    /// Kind of the notification this event was parsed from.
    #[must_use]
    pub const fn kind(&self) -> UrcKind {
        match self {
            Self::Closed { .. } => UrcKind::Closed,
            Self::Incoming { .. } => UrcKind::Incoming,
            Self::Recv { .. } => UrcKind::Recv,
            Self::IncomingFull => UrcKind::IncomingFull,
            Self::PdpDeactivated { .. } => UrcKind::PdpDeactivated,
        }
    }
}

/// Callbacks invoked in interrupt context.
///
/// Implementations must not block: they run on the board's receive path while
/// a transaction may be waiting for the same bytes.
pub trait ReceiveHandler: Send + Sync {
    /// A notification keyword was found in a receive event.
    fn on_urc_detected(&self, interrupts: &Interrupts, event: RawEvent) {
        interrupts.enqueue(event);
    }

    /// Bytes arrived while transparent mode is active.
    fn on_transparent_data(&self, data: &[u8]) {
        tracing::debug!(
            "transparent data ({} bytes): {}",
            data.len(),
            String::from_utf8_lossy(data)
        );
    }

    /// The remote end of the transparent connection disconnected.
    fn on_transparent_closed(&self) {
        tracing::info!("remote end closed the transparent connection");
    }
}

/// [`ReceiveHandler`] that keeps every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReceiveHandler;

impl ReceiveHandler for DefaultReceiveHandler {}

/// Callbacks invoked from [`Modem::handle_events`] in main context.
pub trait EventHandler<B: Board> {
    /// A notification was parsed. The default runs [`dispatch_default`].
    fn on_event(&mut self, modem: &mut Modem<B>, event: Event) {
        dispatch_default(self, modem, event);
    }

    /// Data was read from a buffer-access connection.
    fn on_data(&mut self, connect_id: ConnectId, data: &[u8]) {
        tracing::info!(
            "received {} bytes on connection {}: {}",
            data.len(),
            connect_id,
            hex::encode(data)
        );
    }

    /// A client connected to a listener.
    fn on_incoming(&mut self, server_id: ConnectId, connect_id: ConnectId) {
        tracing::info!("incoming connection {} on listener {}", connect_id, server_id);
    }

    /// A deactivated PDP context was activated again.
    fn on_pdp_reactivated(&mut self, context_id: ContextId) {
        tracing::info!("context {} reactivated", context_id);
    }

    /// The queue is empty and transparent mode is inactive.
    ///
    /// `connect_id` is the connection that was last in transparent mode. The
    /// default switches it back to transparent mode if its socket is still open.
    fn on_transparent_inactive(
        &mut self,
        modem: &mut Modem<B>,
        connect_id: Option<ConnectId>,
        carrier: Carrier,
    ) {
        if carrier == Carrier::Lost {
            tracing::debug!("transparent mode left after carrier loss");
        }

        let Some(connect_id) = connect_id else {
            return;
        };

        match modem.is_socket_open(connect_id) {
            Ok(true) => match modem.enter_transparent_mode(connect_id) {
                Ok(()) => tracing::info!("connection {} back in transparent mode", connect_id),
                Err(e) => tracing::warn!("failed to re-enter transparent mode: {}", e),
            },
            Ok(false) => {}
            Err(e) => tracing::warn!("failed to check connection {}: {}", connect_id, e),
        }
    }
}

/// [`EventHandler`] that keeps every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl<B: Board> EventHandler<B> for DefaultHandler {}

/// Default reaction to a parsed notification.
///
/// - `Closed`: closes the connection; if it is the transparent-mode connection
///   its carrier is marked as lost.
/// - `Incoming` and `Recv`: forwarded to [`EventHandler::on_incoming`] and
///   [`EventHandler::on_data`].
/// - `IncomingFull`: logged.
/// - `PdpDeactivated`: the context is activated again, then
///   [`EventHandler::on_pdp_reactivated`] runs.
pub fn dispatch_default<B, H>(handler: &mut H, modem: &mut Modem<B>, event: Event)
where
    B: Board,
    H: EventHandler<B> + ?Sized,
{
    match event {
        Event::Closed { connect_id } => {
            let state = modem.transparent_state();
            if let Err(e) = modem.close_socket(connect_id) {
                tracing::warn!("failed to close connection {}: {}", connect_id, e);
            }
            if state.connect_id == Some(connect_id) {
                modem.interrupts().mark_carrier_lost();
            }
        }
        Event::Incoming {
            connect_id,
            server_id,
        } => handler.on_incoming(server_id, connect_id),
        Event::Recv { connect_id, data } => handler.on_data(connect_id, &data),
        Event::IncomingFull => {
            tracing::warn!("listener rejected a client: all connections in use");
        }
        Event::PdpDeactivated { context_id } => {
            match modem.activate_pdp(context_id) {
                Ok(status) if status.is_active() => {}
                Ok(_) => tracing::warn!("context {} still inactive", context_id),
                Err(e) => tracing::warn!("failed to reactivate context {}: {}", context_id, e),
            }
            handler.on_pdp_reactivated(context_id);
        }
    }
}

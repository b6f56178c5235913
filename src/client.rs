//! Main [`Modem`] driver implementation.
//!
//! The driver is split between two contexts:
//!
//! - [`Interrupts`] is the cheap, cloneable handle the board calls from its
//!   receive, tick and ring-indicator sources. It owns the state both contexts
//!   touch: the timeout counter, the transparent-mode state and the event queue.
//! - [`Modem`] runs in main context. It sends commands, waits for replies and
//!   drains the event queue.
//!
//! Every receive event is copied into an immutable [`Bytes`] message and handed
//! to the transaction engine over a bounded channel, so a later receive never
//! overwrites bytes a wait has not looked at yet.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{
    DefaultReceiveHandler, Event, EventHandler, EventQueue, QueueItem, ReceiveHandler,
};
use crate::protocol::command::NO_CARRIER;
use crate::protocol::frame::{ReplyBuffer, contains, encode};
use crate::protocol::parser;
use crate::protocol::urc::{RawEvent, UrcKind, scan};
use crate::timer::TimeoutCounter;
use crate::transport::{Board, RingEdge};
use crate::types::{Carrier, TransparentState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    timer: TimeoutCounter,
    transparent: Mutex<TransparentState>,
    queue: Mutex<EventQueue<QueueItem>>,
    replies: mpsc::Sender<Bytes>,
    handler: Box<dyn ReceiveHandler>,
}

/// Interrupt-context entry points and the state shared with [`Modem`].
#[derive(Clone)]
pub struct Interrupts {
    shared: Arc<Shared>,
}

impl fmt::Debug for Interrupts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupts")
            .field("timer", &self.shared.timer)
            .field("transparent", &self.transparent_state())
            .field("queued", &self.queue_len())
            .finish_non_exhaustive()
    }
}

impl Interrupts {
    fn new(
        config: &Config,
        replies: mpsc::Sender<Bytes>,
        handler: Box<dyn ReceiveHandler>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                timer: TimeoutCounter::new(config.ticks_per_second),
                transparent: Mutex::new(TransparentState::default()),
                queue: Mutex::new(EventQueue::new()),
                replies,
                handler,
            }),
        }
    }

    /// Handles one receive event from the serial link.
    ///
    /// Carrier loss is checked first. Notification keywords are only scanned
    /// while transparent mode is inactive; in transparent mode the bytes go to
    /// [`ReceiveHandler::on_transparent_data`]. Every event is also handed to
    /// the transaction engine.
    pub fn on_receive(&self, data: &[u8]) {
        let data = Bytes::copy_from_slice(data);
        tracing::trace!("rx {} bytes: {}", data.len(), hex::encode(&data));

        let state = self.transparent_state();
        let handler = &self.shared.handler;

        if contains(&data, NO_CARRIER.as_bytes()) {
            handler.on_transparent_closed();
            let previous = self.update_transparent(TransparentState::carrier_lost);
            tracing::info!(
                "carrier lost on connection {:?}, transparent mode inactive",
                previous.connect_id.map(|id| id.get())
            );
            self.enqueue(RawEvent::synthetic(UrcKind::NoCarrier));
        } else if state.is_active() {
            handler.on_transparent_data(&data);
        }

        if !state.is_active() {
            for event in scan(&data) {
                tracing::debug!("detected {} notification", event.kind);
                handler.on_urc_detected(self, event);
            }
        }

        match self.shared.replies.try_send(data) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!("reply channel full, dropping receive event");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("driver dropped, ignoring receive event");
            }
        }
    }

    /// Advances the timeout counter by one tick.
    pub fn on_tick(&self) {
        self.shared.timer.tick();
    }

    /// Handles an edge on the ring-indicator line.
    ///
    /// A falling edge while transparent mode is active means the module left
    /// it on its own: the state becomes inactive and an exit event is queued.
    pub fn on_ring_indicator(&self, edge: RingEdge) {
        match edge {
            RingEdge::Falling => {
                let previous = self.update_transparent(|state| {
                    if state.is_active() {
                        state.exited()
                    } else {
                        state
                    }
                });
                if previous.is_active() {
                    tracing::info!("ring indicator forced transparent mode inactive");
                    self.enqueue(RawEvent::synthetic(UrcKind::ExitTransparentMode));
                }
            }
            RingEdge::Rising => tracing::trace!("ring indicator rising edge"),
        }
    }

    /// Queues a detected notification. Returns false if the queue is full.
    pub fn enqueue(&self, event: RawEvent) -> bool {
        let mut queue = lock(&self.shared.queue);
        let item = QueueItem::from(event);
        tracing::debug!("queue put: {}", item);
        match queue.put(item) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("dropping notification: {}", e);
                false
            }
        }
    }

    /// Current transparent-mode state.
    #[must_use]
    pub fn transparent_state(&self) -> TransparentState {
        *lock(&self.shared.transparent)
    }

    /// Marks the carrier of the transparent connection as lost without
    /// changing the mode.
    pub fn mark_carrier_lost(&self) {
        self.update_transparent(|state| TransparentState {
            carrier: Carrier::Lost,
            ..state
        });
    }

    /// Returns true if no notification is queued.
    #[must_use]
    pub fn queue_is_empty(&self) -> bool {
        lock(&self.shared.queue).is_empty()
    }

    /// Returns true if the notification queue has no free slot.
    #[must_use]
    pub fn queue_is_full(&self) -> bool {
        lock(&self.shared.queue).is_full()
    }

    /// Number of queued notifications.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    pub(crate) fn pop_event(&self) -> Option<QueueItem> {
        let item = lock(&self.shared.queue).pop().ok()?;
        tracing::debug!("queue pop: {}", item);
        Some(item)
    }

    #[cfg(test)]
    pub(crate) fn set_transparent_state(&self, state: TransparentState) {
        *lock(&self.shared.transparent) = state;
    }

    /// Applies `f` under the lock and returns the previous state.
    pub(crate) fn update_transparent(
        &self,
        f: impl FnOnce(TransparentState) -> TransparentState,
    ) -> TransparentState {
        let mut guard = lock(&self.shared.transparent);
        let previous = *guard;
        *guard = f(previous);
        previous
    }

    pub(crate) fn timer(&self) -> &TimeoutCounter {
        &self.shared.timer
    }
}

/// Progress of a reply wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Neither the reply nor the timeout has arrived yet.
    Pending,
    /// The reply arrived.
    Ready,
    /// The timeout elapsed first.
    TimedOut,
}

/// An outstanding reply wait, advanced with [`Modem::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyWait {
    expected: Vec<String>,
    timeout_secs: u32,
    replied: bool,
}

impl ReplyWait {
    /// Markers searched for; empty when any reply satisfies the wait.
    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    /// Timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    fn timeout_error(&self) -> Error {
        if self.expected.is_empty() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::DesiredAnswerTimeout {
                expected: self.expected.join(" | "),
                timeout_secs: self.timeout_secs,
            }
        }
    }
}

/// Builder for [`Modem`].
pub struct ModemBuilder<B> {
    config: Config,
    board: Option<B>,
    receive_handler: Option<Box<dyn ReceiveHandler>>,
}

impl<B> fmt::Debug for ModemBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModemBuilder")
            .field("config", &self.config)
            .field("board", &self.board.is_some())
            .field("receive_handler", &self.receive_handler.is_some())
            .finish()
    }
}

impl<B: Board> ModemBuilder<B> {
    /// Sets the driver configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the board the module is wired to.
    #[must_use]
    pub fn board(mut self, board: B) -> Self {
        self.board = Some(board);
        self
    }

    /// Replaces the interrupt-context callbacks.
    #[must_use]
    pub fn receive_handler(mut self, handler: impl ReceiveHandler + 'static) -> Self {
        self.receive_handler = Some(Box::new(handler));
        self
    }

    /// Builds the driver and attaches the board's event sources.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] if no board was given.
    pub fn build(self) -> Result<Modem<B>> {
        let mut board = self.board.ok_or(Error::MissingArgument("board"))?;
        let (tx, rx) = mpsc::channel(self.config.reply_capacity.max(1));
        let handler = self
            .receive_handler
            .unwrap_or_else(|| Box::new(DefaultReceiveHandler));

        let interrupts = Interrupts::new(&self.config, tx, handler);
        board.attach(&interrupts);

        Ok(Modem {
            board,
            config: self.config,
            interrupts,
            replies: rx,
            reply: ReplyBuffer::new(),
            seq: 0,
            configured: false,
            initialized: false,
        })
    }
}

/// Driver for a BG77 module.
pub struct Modem<B> {
    board: B,
    config: Config,
    interrupts: Interrupts,
    replies: mpsc::Receiver<Bytes>,
    reply: ReplyBuffer,
    seq: u32,
    pub(crate) configured: bool,
    pub(crate) initialized: bool,
}

impl<B> fmt::Debug for Modem<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modem")
            .field("config", &self.config)
            .field("interrupts", &self.interrupts)
            .field("seq", &self.seq)
            .field("configured", &self.configured)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl<B: Board> Modem<B> {
    /// Returns a builder for the driver.
    #[must_use]
    pub fn builder() -> ModemBuilder<B> {
        ModemBuilder {
            config: Config::default(),
            board: None,
            receive_handler: None,
        }
    }

    /// Handle for the board's interrupt sources.
    #[must_use]
    pub const fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    /// Driver configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The board.
    #[must_use]
    pub const fn board(&self) -> &B {
        &self.board
    }

    /// Mutable access to the board.
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Current transparent-mode state.
    #[must_use]
    pub fn transparent_state(&self) -> TransparentState {
        self.interrupts.transparent_state()
    }

    /// Bytes received since the last command was sent.
    #[must_use]
    pub fn reply(&self) -> &[u8] {
        self.reply.as_bytes()
    }

    /// Returns true if the current reply contains `marker`.
    #[must_use]
    pub fn reply_contains(&self, marker: &str) -> bool {
        self.reply.contains(marker)
    }

    /// Discards pending receive events and the current reply.
    pub(crate) fn begin_transaction(&mut self) {
        while self.replies.try_recv().is_ok() {}
        self.reply.clear();
    }

    /// Writes raw bytes to the module.
    pub(crate) fn transmit_raw(&mut self, data: &[u8]) -> Result<()> {
        tracing::trace!("tx {} bytes: {}", data.len(), hex::encode(data));
        self.board.transmit(data).map_err(|e| {
            tracing::error!("transmit failed: {}", e);
            Error::Transmit(e)
        })
    }

    pub(crate) fn delay_ms(&mut self, ms: u32) {
        self.board.delay_ms(ms);
    }

    /// Sends a command line and starts waiting for any reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transmit`] if the board fails to write the line; no
    /// wait is started in that case.
    pub fn begin_send(
        &mut self,
        timeout_secs: u32,
        command: impl fmt::Display,
    ) -> Result<ReplyWait> {
        let line = encode(command);
        self.begin_transaction();

        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        tracing::debug!(
            "tx[{}] {}",
            seq,
            String::from_utf8_lossy(&line).trim_end()
        );
        self.transmit_raw(&line)?;
        self.interrupts.timer().start();

        Ok(ReplyWait {
            expected: Vec::new(),
            timeout_secs,
            replied: false,
        })
    }

    /// Starts waiting for one of `markers` in the current reply.
    ///
    /// The reply accumulated so far counts, so a marker that already arrived
    /// satisfies the wait on the first poll.
    pub fn begin_wait_for(&mut self, markers: &[&str], timeout_secs: u32) -> ReplyWait {
        self.interrupts.timer().start();
        ReplyWait {
            expected: markers.iter().map(|m| (*m).to_owned()).collect(),
            timeout_secs,
            replied: false,
        }
    }

    /// Advances a wait by one step without blocking.
    pub fn poll(&mut self, wait: &mut ReplyWait) -> WaitStatus {
        while let Ok(chunk) = self.replies.try_recv() {
            self.reply.feed(&chunk);
            wait.replied = true;
        }

        let satisfied = if wait.expected.is_empty() {
            wait.replied
        } else {
            wait.expected.iter().any(|marker| self.reply.contains(marker))
        };

        let timer = self.interrupts.timer();
        if satisfied {
            timer.stop();
            WaitStatus::Ready
        } else if timer.elapsed() >= wait.timeout_secs {
            timer.stop();
            WaitStatus::TimedOut
        } else {
            WaitStatus::Pending
        }
    }

    /// Polls `wait` until it completes, relaxing the board between polls.
    ///
    /// # Errors
    ///
    /// Returns the wait's timeout error if it timed out.
    pub fn block_on(&mut self, wait: &mut ReplyWait) -> Result<()> {
        loop {
            match self.poll(wait) {
                WaitStatus::Pending => self.board.relax(),
                WaitStatus::Ready => return Ok(()),
                WaitStatus::TimedOut => return Err(wait.timeout_error()),
            }
        }
    }

    /// Sends a command and blocks until any reply arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transmit`] if the line could not be written, or
    /// [`Error::Timeout`] if nothing arrived within `timeout_secs`.
    pub fn send(&mut self, timeout_secs: u32, command: impl fmt::Display) -> Result<()> {
        let seq = self.seq;
        let mut wait = self.begin_send(timeout_secs, command)?;
        match self.block_on(&mut wait) {
            Ok(()) => {
                tracing::debug!(
                    "rx[{}] ({} bytes) {:?}",
                    seq,
                    self.reply.buffered(),
                    self.reply.text().trim()
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("command {} got no reply: {}", seq, e);
                Err(e)
            }
        }
    }

    /// Blocks until the current reply contains `marker`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DesiredAnswerTimeout`] if the marker did not arrive
    /// within `timeout_secs`.
    pub fn wait_for(&mut self, marker: &str, timeout_secs: u32) -> Result<()> {
        self.wait_for_any(&[marker], timeout_secs).map(|_| ())
    }

    /// Blocks until the current reply contains one of `markers` and returns
    /// the index of the first listed marker that is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DesiredAnswerTimeout`] if none arrived within
    /// `timeout_secs`.
    pub fn wait_for_any(&mut self, markers: &[&str], timeout_secs: u32) -> Result<usize> {
        let mut wait = self.begin_wait_for(markers, timeout_secs);
        self.block_on(&mut wait)?;
        self.reply
            .find_any(markers)
            .ok_or_else(|| wait.timeout_error())
    }

    /// Processes at most one queued notification.
    ///
    /// With an empty queue and transparent mode inactive,
    /// [`EventHandler::on_transparent_inactive`] runs instead. Transparent mode
    /// is left before a queued notification is processed. Returns the kind of
    /// the processed notification.
    pub fn handle_events<H>(&mut self, handler: &mut H) -> Option<UrcKind>
    where
        H: EventHandler<B> + ?Sized,
    {
        if self.interrupts.queue_is_empty() {
            let state = self.transparent_state();
            if !state.is_active() {
                handler.on_transparent_inactive(self, state.connect_id, state.carrier);
            }
            return None;
        }

        if self.transparent_state().is_active() {
            match self.exit_transparent_mode() {
                Ok(()) => tracing::info!("left transparent mode to process notifications"),
                Err(e) => tracing::warn!("failed to leave transparent mode: {}", e),
            }
        }

        let item = self.interrupts.pop_event()?;
        let Some(raw) = item.into_urc() else {
            tracing::warn!("ignoring queue entry that is not a notification");
            return None;
        };

        let kind = raw.kind;
        self.process_event(&raw, handler);
        Some(kind)
    }

    fn process_event<H: EventHandler<B> + ?Sized>(&mut self, raw: &RawEvent, handler: &mut H) {
        match raw.kind {
            UrcKind::ExitTransparentMode => match self.exit_transparent_mode() {
                Ok(()) => tracing::info!("transparent mode exit confirmed"),
                Err(e) => {
                    if self.transparent_state().carrier == Carrier::Lost {
                        tracing::info!("transparent mode ended by carrier loss");
                    } else {
                        tracing::warn!("transparent mode exit failed: {}", e);
                    }
                }
            },
            UrcKind::NoCarrier => {
                if let Some(connect_id) = self.transparent_state().connect_id {
                    if let Err(e) = self.close_socket(connect_id) {
                        tracing::warn!("failed to close connection {}: {}", connect_id, e);
                    }
                }
            }
            _ => match self.parse_event(raw) {
                Ok(event) => {
                    tracing::debug!("dispatching {} event", event.kind());
                    handler.on_event(self, event);
                }
                Err(e) => tracing::warn!("dropping {} notification: {}", raw.kind, e),
            },
        }
    }

    /// Parses a module notification, reading the pending data for `recv`.
    fn parse_event(&mut self, raw: &RawEvent) -> Result<Event> {
        let payload = &raw.payload;
        let event = match raw.kind {
            UrcKind::Closed => Event::Closed {
                connect_id: parser::parse_closed(payload)?,
            },
            UrcKind::Incoming => {
                let (connect_id, server_id) = parser::parse_incoming(payload)?;
                Event::Incoming {
                    connect_id,
                    server_id,
                }
            }
            UrcKind::Recv => {
                let connect_id = parser::parse_recv(payload)?;
                let data = self.receive_buffer_access(connect_id)?;
                Event::Recv { connect_id, data }
            }
            UrcKind::IncomingFull => Event::IncomingFull,
            UrcKind::PdpDeactivated => Event::PdpDeactivated {
                context_id: parser::parse_pdp_deactivated(payload)?,
            },
            UrcKind::ExitTransparentMode | UrcKind::NoCarrier => {
                return Err(Error::Protocol {
                    message: format!("{} carries no fields", raw.kind),
                });
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::event::{DefaultHandler, dispatch_default};
    use crate::transport::mock::MockBoard;
    use crate::types::{ConnectId, ContextId, TransparentStatus};

    fn config() -> Config {
        Config::new()
            .ticks_per_second(10)
            .escape_guard_ms(0, 0)
    }

    fn modem(board: MockBoard) -> Modem<MockBoard> {
        Modem::builder().config(config()).board(board).build().unwrap()
    }

    fn id(value: u8) -> ConnectId {
        ConnectId::new(value).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        inactive: Vec<(Option<ConnectId>, Carrier)>,
        data: Vec<(ConnectId, Vec<u8>)>,
        incoming: Vec<(ConnectId, ConnectId)>,
        reactivated: Vec<ContextId>,
    }

    impl EventHandler<MockBoard> for Recorder {
        fn on_event(&mut self, modem: &mut Modem<MockBoard>, event: Event) {
            self.events.push(event.clone());
            dispatch_default(self, modem, event);
        }

        fn on_data(&mut self, connect_id: ConnectId, data: &[u8]) {
            self.data.push((connect_id, data.to_vec()));
        }

        fn on_incoming(&mut self, server_id: ConnectId, connect_id: ConnectId) {
            self.incoming.push((server_id, connect_id));
        }

        fn on_pdp_reactivated(&mut self, context_id: ContextId) {
            self.reactivated.push(context_id);
        }

        fn on_transparent_inactive(
            &mut self,
            _modem: &mut Modem<MockBoard>,
            connect_id: Option<ConnectId>,
            carrier: Carrier,
        ) {
            self.inactive.push((connect_id, carrier));
        }
    }

    #[test]
    fn test_build_without_board() {
        let result = Modem::<MockBoard>::builder().build();
        assert!(matches!(result, Err(Error::MissingArgument("board"))));
    }

    #[test]
    fn test_send_reply_after_one_second() {
        let mut modem = modem(MockBoard::new().reply("AT", "\r\nOK\r\n", 10));

        modem.send(5, "AT").unwrap();

        assert!(modem.reply_contains("OK"));
        assert_eq!(modem.board().sent_text(), vec!["AT\r\n"]);
        assert_eq!(modem.interrupts().timer().elapsed(), 1);
        assert!(!modem.interrupts().timer().is_armed());
    }

    #[test]
    fn test_send_times_out_without_reply() {
        let mut modem = modem(MockBoard::new().silent());

        let err = modem.send(5, "AT").unwrap_err();

        assert!(matches!(err, Error::Timeout { timeout_secs: 5 }));
        assert_eq!(modem.interrupts().timer().elapsed(), 5);
    }

    #[test]
    fn test_send_transmit_failure_skips_wait() {
        let mut board = MockBoard::new();
        board.fail_transmit = true;
        let mut modem = modem(board);

        assert!(matches!(modem.send(5, "AT"), Err(Error::Transmit(_))));
        assert!(!modem.interrupts().timer().is_armed());
    }

    #[test]
    fn test_poll_state_machine() {
        let mut modem = modem(MockBoard::new().reply("AT", "\r\nOK\r\n", 3));
        let mut wait = modem.begin_send(1, "AT").unwrap();

        assert_eq!(modem.poll(&mut wait), WaitStatus::Pending);
        modem.board_mut().relax();
        modem.board_mut().relax();
        assert_eq!(modem.poll(&mut wait), WaitStatus::Pending);
        modem.board_mut().relax();
        assert_eq!(modem.poll(&mut wait), WaitStatus::Ready);
    }

    #[test]
    fn test_reply_before_send_is_not_seen() {
        let mut modem = modem(MockBoard::new().silent());
        modem.interrupts().on_receive(b"\r\nOK\r\n");

        assert!(matches!(modem.send(1, "AT"), Err(Error::Timeout { .. })));
        assert!(!modem.reply_contains("OK"));
    }

    #[test]
    fn test_wait_for_marker_in_later_event() {
        let mut modem = modem(MockBoard::new().reply("AT+QIOPEN", "\r\nOK\r\n", 1).silent());
        modem.send(5, "AT+QIOPEN=1,0,\"TCP\",\"1.2.3.4\",80,0,0").unwrap();

        let irq = modem.interrupts().clone();
        irq.on_receive(b"\r\n+QIOPEN: 0,0\r\n");

        assert_eq!(modem.wait_for_any(&["+QIOPEN: 0,0", ",0"], 2).unwrap(), 0);
        assert!(matches!(
            modem.wait_for("CONNECT", 2),
            Err(Error::DesiredAnswerTimeout { timeout_secs: 2, .. })
        ));
    }

    #[test]
    fn test_closed_notification_closes_connection() {
        let mut modem = modem(MockBoard::new());
        modem.interrupts().on_receive(b"+QIURC: \"closed\",3\r\n");

        assert_eq!(modem.interrupts().queue_len(), 1);

        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), Some(UrcKind::Closed));
        assert_eq!(recorder.events, vec![Event::Closed { connect_id: id(3) }]);
        assert!(modem.board().sent_contains("AT+QICLOSE=3\r\n"));
        assert!(modem.interrupts().queue_is_empty());
    }

    #[test]
    fn test_closed_marks_transparent_connection_lost() {
        let mut modem = modem(MockBoard::new());
        let active = TransparentState::entered(id(3));
        modem.interrupts().set_transparent_state(active.exited());
        modem.interrupts().on_receive(b"+QIURC: \"closed\",3\r\n");

        modem.handle_events(&mut DefaultHandler);

        let state = modem.transparent_state();
        assert_eq!(state.carrier, Carrier::Lost);
        assert_eq!(state.connect_id, Some(id(3)));
    }

    #[test]
    fn test_no_carrier_while_active() {
        let closed = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        impl ReceiveHandler for Counting {
            fn on_transparent_closed(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut modem = Modem::builder()
            .config(config())
            .board(MockBoard::new())
            .receive_handler(Counting(Arc::clone(&closed)))
            .build()
            .unwrap();
        modem
            .interrupts()
            .set_transparent_state(TransparentState::entered(id(5)));

        modem.interrupts().on_receive(b"\r\nNO CARRIER\r\n");

        let state = modem.transparent_state();
        assert_eq!(state.status, TransparentStatus::Inactive);
        assert_eq!(state.carrier, Carrier::Lost);
        assert_eq!(state.connect_id, Some(id(5)));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(modem.interrupts().queue_len(), 1);

        assert_eq!(modem.handle_events(&mut DefaultHandler), Some(UrcKind::NoCarrier));
        assert!(modem.board().sent_contains("AT+QICLOSE=5\r\n"));
    }

    #[test]
    fn test_no_carrier_while_inactive_still_forces_state() {
        let modem = modem(MockBoard::new());
        modem.interrupts().on_receive(b"NO CARRIER\r\n");

        let state = modem.transparent_state();
        assert!(!state.is_active());
        assert_eq!(state.carrier, Carrier::Lost);
        assert_eq!(modem.interrupts().queue_len(), 1);
    }

    #[test]
    fn test_two_incoming_notifications() {
        let mut modem = modem(MockBoard::new());
        modem.interrupts().on_receive(
            b"+QIURC: \"incoming\",1,0,\"10.0.0.2\",4000\r\n+QIURC: \"incoming\",2,0,\"10.0.0.3\",4001\r\n",
        );
        assert_eq!(modem.interrupts().queue_len(), 2);

        let mut recorder = Recorder::default();
        modem.handle_events(&mut recorder);
        modem.handle_events(&mut recorder);

        assert_eq!(recorder.incoming, vec![(id(0), id(1)), (id(0), id(2))]);
    }

    #[test]
    fn test_transparent_data_is_not_scanned() {
        let mut modem = modem(MockBoard::new());
        modem
            .interrupts()
            .set_transparent_state(TransparentState::entered(id(1)));

        modem.interrupts().on_receive(b"payload mentions closed,3\n");

        assert!(modem.interrupts().queue_is_empty());
        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), None);
        assert!(recorder.inactive.is_empty());
    }

    #[test]
    fn test_recv_reads_pending_data() {
        let mut modem = modem(
            MockBoard::new().reply("AT+QIRD=4", "\r\n+QIRD: 5\r\nhello\r\n\r\nOK\r\n", 1),
        );
        modem.interrupts().on_receive(b"+QIURC: \"recv\",4\r\n");

        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), Some(UrcKind::Recv));
        assert_eq!(recorder.data, vec![(id(4), b"hello".to_vec())]);
    }

    #[test]
    fn test_pdp_deactivated_reactivates() {
        let mut modem = modem(
            MockBoard::new().reply("AT+QIACT?", "\r\n+QIACT: 1,1,1,\"10.0.0.9\"\r\n\r\nOK\r\n", 1),
        );
        modem.interrupts().on_receive(b"+QIURC: \"pdpdeact\",1\r\n");

        let mut recorder = Recorder::default();
        modem.handle_events(&mut recorder);

        assert!(modem.board().sent_contains("AT+QIACT=1\r\n"));
        assert_eq!(recorder.reactivated, vec![ContextId::new(1).unwrap()]);
    }

    #[test]
    fn test_incoming_full_is_dispatched() {
        let mut modem = modem(MockBoard::new());
        modem.interrupts().on_receive(b"+QIURC: \"incoming full\"\r\n");
        assert_eq!(modem.interrupts().queue_len(), 1);

        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), Some(UrcKind::IncomingFull));
        assert_eq!(recorder.events, vec![Event::IncomingFull]);
        assert!(modem.board().sent.is_empty());
    }

    #[test]
    fn test_drain_leaves_transparent_mode_first() {
        let mut modem = modem(MockBoard::new());
        let irq = modem.interrupts().clone();
        irq.set_transparent_state(TransparentState::entered(id(1)));
        irq.enqueue(RawEvent::new(
            UrcKind::Closed,
            Bytes::from_static(b"closed\",1\r\n"),
        ));

        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), Some(UrcKind::Closed));

        assert_eq!(modem.board().sent_text(), vec!["+++", "AT+QICLOSE=1\r\n"]);
        let state = modem.transparent_state();
        assert!(!state.is_active());
        assert_eq!(state.carrier, Carrier::Lost);
        assert_eq!(state.connect_id, Some(id(1)));
    }

    #[test]
    fn test_ring_indicator_event_exits_transparent_mode() {
        let mut modem = modem(MockBoard::new());
        let irq = modem.interrupts().clone();
        irq.set_transparent_state(TransparentState::entered(id(4)));
        irq.on_ring_indicator(RingEdge::Falling);

        let mut recorder = Recorder::default();
        assert_eq!(
            modem.handle_events(&mut recorder),
            Some(UrcKind::ExitTransparentMode)
        );

        assert_eq!(modem.board().sent_text(), vec!["+++"]);
        assert!(recorder.events.is_empty());
        let state = modem.transparent_state();
        assert!(!state.is_active());
        assert_eq!(state.connect_id, Some(id(4)));
        assert!(modem.interrupts().queue_is_empty());
    }

    #[test]
    fn test_sequence_number_advances_per_command() {
        let mut modem = modem(MockBoard::new());
        assert_eq!(modem.seq, 0);

        modem.send(1, "AT").unwrap();
        assert_eq!(modem.seq, 1);

        let mut wait = modem.begin_send(1, "AT").unwrap();
        assert_eq!(modem.seq, 2);
        modem.block_on(&mut wait).unwrap();

        modem.board_mut().fail_transmit = true;
        assert!(modem.send(1, "AT").is_err());
        assert_eq!(modem.seq, 3);
    }

    #[test]
    fn test_malformed_notification_is_dropped() {
        let mut modem = modem(MockBoard::new());
        modem.interrupts().on_receive(b"+QIURC: \"closed\"\r\n");

        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), Some(UrcKind::Closed));
        assert!(recorder.events.is_empty());
        assert!(!modem.board().sent_contains("AT+QICLOSE"));
    }

    #[test]
    fn test_empty_queue_reports_inactive_mode() {
        let mut modem = modem(MockBoard::new());
        modem
            .interrupts()
            .set_transparent_state(TransparentState::entered(id(2)).carrier_lost());

        let mut recorder = Recorder::default();
        assert_eq!(modem.handle_events(&mut recorder), None);
        assert_eq!(recorder.inactive, vec![(Some(id(2)), Carrier::Lost)]);
    }

    #[test]
    fn test_ring_indicator_falling_edge() {
        let modem = modem(MockBoard::new());
        let irq = modem.interrupts();

        irq.on_ring_indicator(RingEdge::Falling);
        assert!(irq.queue_is_empty());

        irq.set_transparent_state(TransparentState::entered(id(4)));
        irq.on_ring_indicator(RingEdge::Rising);
        assert!(irq.transparent_state().is_active());

        irq.on_ring_indicator(RingEdge::Falling);
        let state = irq.transparent_state();
        assert!(!state.is_active());
        assert_eq!(state.carrier, Carrier::Present);
        assert_eq!(state.connect_id, Some(id(4)));
        assert_eq!(irq.queue_len(), 1);
    }

    #[test]
    fn test_queue_full_drops_notifications() {
        let modem = modem(MockBoard::new());
        let irq = modem.interrupts();
        for _ in 0..crate::event::DEFAULT_CAPACITY {
            assert!(irq.enqueue(RawEvent::synthetic(UrcKind::IncomingFull)));
        }
        assert!(irq.queue_is_full());
        assert!(!irq.enqueue(RawEvent::synthetic(UrcKind::IncomingFull)));
    }
}

//! Transparent-mode transitions.

use crate::client::Modem;
use crate::error::{Error, Result};
use crate::protocol::command::{CONNECT, ESCAPE_SEQUENCE, OK, QIURC, timeout};
use crate::transport::Board;
use crate::types::{ConnectId, TransparentState};

impl<B: Board> Modem<B> {
    /// Switches `connect_id` to transparent mode.
    ///
    /// Succeeds immediately if transparent mode is already active. On success
    /// the carrier flag is reset and `connect_id` is recorded.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if a command fails, or
    /// [`Error::DesiredAnswerTimeout`] if `CONNECT` never arrives.
    pub fn enter_transparent_mode(&mut self, connect_id: ConnectId) -> Result<()> {
        if self.transparent_state().is_active() {
            return Ok(());
        }

        let wait_time = self.config().transparent_wait_time;
        self.send(
            timeout::QUERY,
            format_args!("AT+QICFG=\"transwaittm\",{wait_time}"),
        )?;
        self.send(timeout::QUERY, "AT+QICFG=\"transwaittm\"")?;
        self.send(timeout::QUERY, format_args!("AT+QISWTMD={connect_id},2"))?;

        let answer = self.config().answer_timeout_secs;
        self.wait_for(CONNECT, answer)?;

        self.interrupts()
            .update_transparent(|_| TransparentState::entered(connect_id));
        tracing::info!("connection {} in transparent mode", connect_id);
        Ok(())
    }

    /// Leaves transparent mode with the `+++` escape sequence.
    ///
    /// The sequence is surrounded by the configured guard times. On success the
    /// state becomes inactive; the carrier flag and connection are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transmit`] if the escape could not be written, or
    /// [`Error::DesiredAnswerTimeout`] if neither `OK` nor a notification
    /// followed it.
    pub fn exit_transparent_mode(&mut self) -> Result<()> {
        let before = self.config().escape_guard_before_ms;
        let after = self.config().escape_guard_after_ms;
        let answer = self.config().answer_timeout_secs;

        self.delay_ms(before);
        self.begin_transaction();
        self.transmit_raw(ESCAPE_SEQUENCE)?;
        self.delay_ms(after);

        self.wait_for_any(&[OK, QIURC], answer)?;

        self.interrupts()
            .update_transparent(TransparentState::exited);
        tracing::info!("transparent mode inactive");
        Ok(())
    }

    /// Writes raw bytes to the transparent connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransparentModeInactive`] if transparent mode is not
    /// active, or [`Error::Transmit`] if the write fails.
    pub fn transmit_transparent(&mut self, data: &[u8]) -> Result<()> {
        if !self.transparent_state().is_active() {
            return Err(Error::TransparentModeInactive);
        }
        self.transmit_raw(data)
    }
}

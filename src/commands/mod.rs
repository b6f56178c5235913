//! AT command catalogue for BG77 operations.
//!
//! Every command is a method on [`Modem`] built on the transaction engine:
//! [`Modem::send`] for "any reply", [`Modem::wait_for`] when a definitive
//! marker has to follow. Queries additionally wait for the final `OK` or
//! `ERROR` before their reply is parsed.

mod transparent;

use std::fmt;

use bytes::Bytes;

use crate::client::Modem;
use crate::error::{Error, Result};
use crate::protocol::command::{
    CONFIGURATION, CONNECT, ERROR, OK, READ_LENGTH, READY, SEND_OK, SEND_PROMPT, SIM_READY,
    timeout,
};
use crate::protocol::parser;
use crate::transport::{Board, Pin};
use crate::types::{
    AccessMode, ConnectId, ContextId, ModuleInfo, OperatorInfo, PdpConfig, PdpContext, PdpStatus,
    RegistrationStatus, SERVER_REMOTE_ADDRESS, Service, SignalQuality, SocketConfig, SocketInfo,
    TransparentState,
};

/// PWRKEY pulse length when switching the module on.
const POWER_ON_PULSE_MS: u32 = 2000;
/// Boot time after the PWRKEY pulse.
const POWER_ON_BOOT_MS: u32 = 6000;
/// Idle time before `AT+QPOWD`.
const POWER_OFF_SETTLE_MS: u32 = 500;
/// Shutdown time after `AT+QPOWD`.
const POWER_OFF_SHUTDOWN_MS: u32 = 3000;

/// Attempts for SIM and registration checks.
const CHECK_ATTEMPTS: usize = 3;

impl<B: Board> Modem<B> {
    /// Sends a query and waits for its final result.
    fn query(&mut self, timeout_secs: u32, command: impl fmt::Display) -> Result<()> {
        self.send(timeout_secs, command)?;
        match self.wait_for_any(&[OK, ERROR], timeout_secs)? {
            0 => Ok(()),
            _ => Err(Error::Protocol {
                message: String::from_utf8_lossy(self.reply()).trim().to_owned(),
            }),
        }
    }

    /// Pulses PWRKEY and RESET, then checks that the module answers `AT`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin cannot be driven or the module stays silent.
    pub fn power_on(&mut self) -> Result<()> {
        self.board_mut().write_pin(Pin::PowerKey, true)?;
        self.board_mut().write_pin(Pin::Reset, true)?;
        self.delay_ms(POWER_ON_PULSE_MS);
        self.board_mut().write_pin(Pin::PowerKey, false)?;
        self.board_mut().write_pin(Pin::Reset, false)?;
        self.delay_ms(POWER_ON_BOOT_MS);

        self.send(timeout::SHORT, "AT")?;
        let answer = self.config().answer_timeout_secs;
        self.wait_for(OK, answer)
    }

    /// Powers the module down with `AT+QPOWD`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `OK` nor `RDY` follows the command.
    pub fn power_off(&mut self) -> Result<()> {
        self.delay_ms(POWER_OFF_SETTLE_MS);
        self.send(timeout::SHORT, "AT+QPOWD")?;
        let answer = self.config().answer_timeout_secs;
        self.wait_for_any(&[OK, READY], answer)?;
        self.delay_ms(POWER_OFF_SHUTDOWN_MS);
        Ok(())
    }

    /// Powers the module on, retrying up to the configured number of attempts.
    ///
    /// When every attempt fails the board is reset and the last error returned.
    fn power_on_with_retry(&mut self) -> Result<()> {
        let attempts = self.config().power_on_attempts.max(1);
        let mut last = None;

        for attempt in 1..=attempts {
            match self.power_on() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("power on attempt {}/{} failed: {}", attempt, attempts, e);
                    last = Some(e);
                }
            }
        }

        tracing::error!("module did not power on, resetting board");
        self.board_mut().reset_device()?;
        Err(last.unwrap_or(Error::Timeout {
            timeout_secs: timeout::SHORT,
        }))
    }

    /// Brings the module into a known configured state.
    ///
    /// Power cycles the module, writes the configuration and leaves RF test
    /// mode. Does nothing once it has succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.power_on_with_retry()?;
        if let Err(e) = self.power_off() {
            tracing::warn!("power off during init failed: {}", e);
        }
        self.power_on_with_retry()?;
        tracing::info!("module powered on");

        self.configure()?;
        self.send(timeout::QUERY, "AT+QRFTESTMODE=0")?;

        self.initialized = true;
        Ok(())
    }

    /// Writes the module configuration. Does nothing once it has succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first failing command's error.
    pub fn configure(&mut self) -> Result<()> {
        if self.configured {
            return Ok(());
        }

        for line in CONFIGURATION {
            self.send(timeout::SHORT, line)?;
        }

        self.configured = true;
        tracing::info!("module configured");
        Ok(())
    }

    /// Reads firmware revision, ICCID and IMEI.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a reply carries no value.
    pub fn module_info(&mut self) -> Result<ModuleInfo> {
        self.query(timeout::SHORT, "AT+GMR")?;
        let firmware =
            parser::parse_identity(self.reply(), b'\n').ok_or(Error::Parse { field: "firmware" })?;

        self.query(timeout::SHORT, "AT+QCCID")?;
        let iccid =
            parser::parse_identity(self.reply(), b' ').ok_or(Error::Parse { field: "iccid" })?;

        self.query(timeout::SHORT, "AT+GSN")?;
        let imei =
            parser::parse_identity(self.reply(), b'\n').ok_or(Error::Parse { field: "imei" })?;

        tracing::debug!("firmware {}, iccid {}, imei {}", firmware, iccid, imei);
        Ok(ModuleInfo {
            firmware,
            iccid,
            imei,
        })
    }

    /// Checks up to three times whether the SIM reports `READY`.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if a query gets no reply.
    pub fn check_sim(&mut self) -> Result<bool> {
        for _ in 0..CHECK_ATTEMPTS {
            self.send(timeout::SHORT, "AT+CPIN?")?;
            if self.reply_contains(SIM_READY) {
                return Ok(true);
            }
        }
        tracing::warn!("SIM not ready");
        Ok(false)
    }

    /// Reads the EPS registration state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the reply has no status field.
    pub fn registration(&mut self) -> Result<RegistrationStatus> {
        self.query(timeout::QUERY, "AT+CEREG?")?;
        parser::parse_registration(self.reply())
    }

    /// Reads the selected operator, if any.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if the query fails.
    pub fn query_operator(&mut self) -> Result<Option<OperatorInfo>> {
        self.query(timeout::QUERY, "AT+COPS?")?;
        let info = parser::parse_operator(self.reply());
        if let Some(info) = &info {
            tracing::debug!(
                "operator {} ({}, {})",
                info.operator,
                info.mode_name(),
                info.access_technology_name()
            );
        }
        Ok(info)
    }

    /// Reads the settings of a PDP context.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if the query fails.
    pub fn query_pdp_config(&mut self, context_id: ContextId) -> Result<Option<PdpConfig>> {
        self.query(timeout::PDP_CONFIG, format_args!("AT+QICSGP={context_id}"))?;
        Ok(parser::parse_pdp_config(self.reply()))
    }

    /// Reads whether a PDP context is active.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if the query fails.
    pub fn check_pdp(&mut self, context_id: ContextId) -> Result<PdpStatus> {
        self.query(timeout::QUERY, "AT+QIACT?")?;
        Ok(parser::parse_pdp_status(self.reply(), context_id))
    }

    /// Reads the state of a connection. `None` if the slot is unused.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if the query fails.
    pub fn check_socket(&mut self, connect_id: ConnectId) -> Result<Option<SocketInfo>> {
        self.query(timeout::QUERY, format_args!("AT+QISTATE=1,{connect_id}"))?;
        Ok(parser::parse_socket_info(self.reply(), connect_id))
    }

    /// Returns true if the connection exists and is neither initial nor closing.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if the query fails.
    pub fn is_socket_open(&mut self, connect_id: ConnectId) -> Result<bool> {
        Ok(self
            .check_socket(connect_id)?
            .is_some_and(|info| info.state.is_open()))
    }

    /// Reads the serving-cell signal report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the module reports no service.
    pub fn query_signal(&mut self) -> Result<SignalQuality> {
        self.query(timeout::QUERY, "AT+QCSQ")?;
        let signal = parser::parse_signal(self.reply())?;
        tracing::debug!("signal {}", signal);
        Ok(signal)
    }

    /// Registers on `operator` (numeric format) over LTE-M.
    ///
    /// # Errors
    ///
    /// Returns the last failure after three unsuccessful attempts.
    pub fn attach(&mut self, operator: &str) -> Result<()> {
        let mut last = None;

        for attempt in 1..=CHECK_ATTEMPTS {
            let selected = self.send(timeout::ATTACH, format_args!("AT+COPS=4,2,\"{operator}\",8"));
            if let Err(e) = selected {
                tracing::warn!("attach attempt {} failed: {}", attempt, e);
                last = Some(e);
                continue;
            }

            match self.registration() {
                Ok(status) if status.is_attached() => {
                    tracing::info!("attached to {}", operator);
                    return Ok(());
                }
                Ok(status) => {
                    last = Some(Error::Protocol {
                        message: format!("registration {status:?} after attach"),
                    });
                }
                Err(e) => last = Some(e),
            }
        }

        Err(last.unwrap_or(Error::Protocol {
            message: "attach failed".into(),
        }))
    }

    /// Deregisters from the network.
    ///
    /// # Errors
    ///
    /// Returns an error if `OK` does not follow.
    pub fn detach(&mut self) -> Result<()> {
        self.send(timeout::DETACH, "AT+COPS=2")?;
        let answer = self.config().answer_timeout_secs;
        self.wait_for(OK, answer)
    }

    /// Writes the settings of a PDP context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the module rejects the settings.
    pub fn configure_pdp(&mut self, context: &PdpContext) -> Result<()> {
        self.query(
            timeout::PDP_CONFIG,
            format_args!(
                "AT+QICSGP={},{},\"{}\",\"{}\",\"{}\",{}",
                context.context_id,
                context.context_type as u8,
                context.apn,
                context.user,
                context.password,
                context.auth as u8
            ),
        )
    }

    /// Activates a PDP context and reads its state back.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if a command fails.
    pub fn activate_pdp(&mut self, context_id: ContextId) -> Result<PdpStatus> {
        self.send(timeout::SOCKET, format_args!("AT+QIACT={context_id}"))?;
        self.check_pdp(context_id)
    }

    /// Deactivates a PDP context and reads its state back.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if a command fails.
    pub fn deactivate_pdp(&mut self, context_id: ContextId) -> Result<PdpStatus> {
        self.send(timeout::SOCKET, format_args!("AT+QIDEACT={context_id}"))?;
        self.check_pdp(context_id)
    }

    /// Opens a TCP client or listener.
    ///
    /// In buffer-access mode the socket state is read back. In transparent
    /// access mode the module answers `CONNECT` and the connection becomes the
    /// transparent-mode connection; `None` is returned since no query can be
    /// sent while the pipe is open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DesiredAnswerTimeout`] if the module does not confirm
    /// the open.
    pub fn open_socket(&mut self, socket: &SocketConfig) -> Result<Option<SocketInfo>> {
        let ctx = socket.context_id;
        let id = socket.connect_id;
        let mode = socket.access_mode as u8;

        match &socket.service {
            Service::Client {
                address,
                remote_port,
            } => self.send(
                timeout::SOCKET,
                format_args!("AT+QIOPEN={ctx},{id},\"TCP\",\"{address}\",{remote_port},0,{mode}"),
            )?,
            Service::Server { local_port } => self.send(
                timeout::SOCKET,
                format_args!(
                    "AT+QIOPEN={ctx},{id},\"TCP LISTENER\",\"{SERVER_REMOTE_ADDRESS}\",0,{local_port},{mode}"
                ),
            )?,
        }

        let answer = self.config().answer_timeout_secs;
        if socket.access_mode == AccessMode::Transparent {
            self.wait_for(CONNECT, answer)?;
            self.interrupts()
                .update_transparent(|_| TransparentState::entered(id));
            tracing::info!("connection {} opened in transparent mode", id);
            return Ok(None);
        }

        let confirmation = format!("+QIOPEN: {id},0");
        self.wait_for_any(&[confirmation.as_str(), ",0"], answer)?;
        tracing::info!("connection {} opened", id);
        self.check_socket(id)
    }

    /// Closes a connection.
    ///
    /// # Errors
    ///
    /// Returns a transaction error if the command gets no reply.
    pub fn close_socket(&mut self, connect_id: ConnectId) -> Result<()> {
        self.send(timeout::SOCKET, format_args!("AT+QICLOSE={connect_id}"))?;
        tracing::debug!("connection {} closed", connect_id);
        Ok(())
    }

    /// Sends data on a buffer-access connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DesiredAnswerTimeout`] if the prompt or `SEND OK`
    /// does not arrive.
    pub fn transmit_buffer_access(&mut self, connect_id: ConnectId, data: &[u8]) -> Result<()> {
        self.send(
            timeout::SHORT,
            format_args!("AT+QISEND={connect_id},{}", data.len()),
        )?;
        let answer = self.config().answer_timeout_secs;
        self.wait_for(SEND_PROMPT, answer)?;

        self.transmit_raw(data)?;

        let long = self.config().long_answer_timeout_secs;
        self.wait_for(SEND_OK, long)?;
        tracing::debug!("sent {} bytes on connection {}", data.len(), connect_id);
        Ok(())
    }

    /// Reads pending data from a buffer-access connection.
    ///
    /// At most 1024 bytes are returned. If the module holds more the
    /// connection is closed, since the remainder cannot be drained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the reply has no length field.
    pub fn receive_buffer_access(&mut self, connect_id: ConnectId) -> Result<Bytes> {
        self.query(
            timeout::READ,
            format_args!("AT+QIRD={connect_id},{READ_LENGTH}"),
        )?;
        let read = parser::parse_read(self.reply())?;
        tracing::trace!("read {} bytes: {}", read.data.len(), hex::encode(&read.data));

        if read.overflow {
            tracing::warn!("connection {} overflowed the read buffer, closing", connect_id);
            if let Err(e) = self.close_socket(connect_id) {
                tracing::warn!("failed to close connection {}: {}", connect_id, e);
            }
        }

        Ok(read.data)
    }
}

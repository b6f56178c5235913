//! Serial board for a BG77 on a host serial port.
//!
//! A reader thread turns every successful read into one receive event. A ticker
//! thread drives the timeout counter and samples the RS-232 ring-indicator
//! line, which carries the module's `MAIN_RI` output on common evaluation
//! boards. `PWRKEY` and `RESET_N` are wired to DTR and RTS.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_serial::SerialPort;

use crate::client::Interrupts;
use crate::error::{Error, Result};
use crate::transport::{Board, Pin, RingEdge};

/// Default baud rate of the BG77 main UART.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout; bounds how long the reader takes to notice shutdown.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Default tick period, matching the driver's default 1000 ticks per second.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the serial board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read timeout of the receive thread.
    pub read_timeout: Duration,
    /// Period of the tick thread.
    pub tick_interval: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the tick period. Pair it with
    /// [`Config::ticks_per_second`](crate::Config::ticks_per_second).
    #[must_use]
    pub const fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

/// [`Board`] backed by a host serial port.
pub struct SerialBoard {
    config: SerialConfig,
    port: Box<dyn SerialPort>,
    interrupts: Option<Interrupts>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for SerialBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialBoard")
            .field("config", &self.config)
            .field("attached", &self.interrupts.is_some())
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl SerialBoard {
    /// Opens the configured port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serial`] if the port cannot be opened.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let port = open_port(&config)?;
        Ok(Self {
            config,
            port,
            interrupts: None,
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        })
    }

    /// Opens `port` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serial`] if the port cannot be opened.
    pub fn with_port(port: impl Into<String>) -> Result<Self> {
        Self::open(SerialConfig::new(port))
    }

    /// The board configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn spawn_workers(&mut self) -> Result<()> {
        let Some(interrupts) = self.interrupts.clone() else {
            return Ok(());
        };
        self.stop.store(false, Ordering::SeqCst);

        let reader = self.port.try_clone().map_err(Error::Serial)?;
        let stop = Arc::clone(&self.stop);
        let irq = interrupts.clone();
        self.workers.push(
            thread::Builder::new()
                .name("bg77-rx".into())
                .spawn(move || run_read_loop(reader, &irq, &stop))?,
        );

        let lines = self.port.try_clone().map_err(Error::Serial)?;
        let stop = Arc::clone(&self.stop);
        let interval = self.config.tick_interval;
        self.workers.push(
            thread::Builder::new()
                .name("bg77-tick".into())
                .spawn(move || run_tick_loop(lines, &interrupts, &stop, interval))?,
        );

        Ok(())
    }

    fn stop_workers(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("serial worker panicked");
            }
        }
    }
}

fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    tracing::info!("opening serial port: {}", config.port);
    let mut port = tokio_serial::new(&config.port, config.baud_rate)
        .timeout(config.read_timeout)
        .open()
        .map_err(Error::Serial)?;

    // PWRKEY and RESET_N idle low
    if let Err(e) = port.write_data_terminal_ready(false) {
        tracing::warn!("failed to clear DTR: {}", e);
    }
    if let Err(e) = port.write_request_to_send(false) {
        tracing::warn!("failed to clear RTS: {}", e);
    }
    if let Err(e) = port.clear(tokio_serial::ClearBuffer::All) {
        tracing::debug!("failed to drain stale bytes: {}", e);
    }

    Ok(port)
}

/// Reads until `stop` is set, one receive event per successful read.
fn run_read_loop(mut reader: Box<dyn SerialPort>, interrupts: &Interrupts, stop: &AtomicBool) {
    let mut buf = [0u8; 1024];

    while !stop.load(Ordering::Relaxed) {
        match reader.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                tracing::trace!("received {} bytes", n);
                interrupts.on_receive(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => {
                tracing::error!("serial read error: {}", e);
                return;
            }
        }
    }
    tracing::debug!("serial reader stopped");
}

/// Ticks the timeout counter and reports ring-indicator edges.
fn run_tick_loop(
    mut lines: Box<dyn SerialPort>,
    interrupts: &Interrupts,
    stop: &AtomicBool,
    interval: Duration,
) {
    let mut ring = lines.read_ring_indicator().unwrap_or(false);

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(interval);
        interrupts.on_tick();

        match lines.read_ring_indicator() {
            Ok(level) if level != ring => {
                ring = level;
                // RS-232 RI is asserted while MAIN_RI is pulled low
                interrupts.on_ring_indicator(if level {
                    RingEdge::Falling
                } else {
                    RingEdge::Rising
                });
            }
            Ok(_) => {}
            Err(e) => tracing::trace!("failed to sample ring indicator: {}", e),
        }
    }
    tracing::debug!("serial ticker stopped");
}

impl Board for SerialBoard {
    fn transmit(&mut self, data: &[u8]) -> io::Result<()> {
        tracing::trace!("sending {} bytes", data.len());
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn write_pin(&mut self, pin: Pin, high: bool) -> io::Result<()> {
        let result = match pin {
            Pin::PowerKey => self.port.write_data_terminal_ready(high),
            Pin::Reset => self.port.write_request_to_send(high),
        };
        result.map_err(io::Error::from)
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn reset_device(&mut self) -> io::Result<()> {
        tracing::warn!("reopening serial port {}", self.config.port);
        self.stop_workers();
        self.port = open_port(&self.config).map_err(io::Error::other)?;
        self.spawn_workers().map_err(io::Error::other)
    }

    fn attach(&mut self, interrupts: &Interrupts) {
        self.stop_workers();
        self.interrupts = Some(interrupts.clone());
        if let Err(e) = self.spawn_workers() {
            tracing::error!("failed to start serial workers: {}", e);
        }
    }

    fn relax(&mut self) {
        thread::yield_now();
    }
}

impl Drop for SerialBoard {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

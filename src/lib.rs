//! # bg77
//!
//! A Rust driver for Quectel BG77 cellular modules over a serial AT-command link.
//!
//! ## Features
//!
//! - Blocking AT transactions with a poll-able wait state machine
//! - Notification (URC) detection in interrupt context, queued for the main loop
//! - Transparent-mode tracking with carrier-loss and ring-indicator handling
//! - Typed command catalogue: power, registration, PDP contexts, TCP sockets
//!
//! ## Quick Start
//!
//! ```no_run
//! use bg77::{ConnectId, ContextId, DefaultHandler, Modem, SerialBoard, SocketConfig};
//!
//! fn main() -> Result<(), bg77::Error> {
//!     let board = SerialBoard::with_port("/dev/ttyUSB0")?;
//!     let mut modem = Modem::builder().board(board).build()?;
//!
//!     modem.init()?;
//!     modem.attach("73001")?;
//!
//!     let ctx = ContextId::new(1)?;
//!     modem.activate_pdp(ctx)?;
//!
//!     let id = ConnectId::new(0)?;
//!     modem.open_socket(&SocketConfig::client(ctx, id, "93.184.216.34", 80))?;
//!     modem.transmit_buffer_access(id, b"GET / HTTP/1.0\r\n\r\n")?;
//!
//!     let mut handler = DefaultHandler;
//!     loop {
//!         modem.handle_events(&mut handler);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - [`Modem`] driver, [`Interrupts`] handle and the transaction engine
//! - [`commands`] - AT command catalogue and transparent-mode transitions
//! - [`event`] - Notification pipeline, handler traits and the bounded [`EventQueue`]
//! - [`protocol`] - Reply markers, notification scanner and field parsers
//! - [`transport`] - [`Board`] seam and the host [`SerialBoard`]
//! - [`types`] - Identifiers, network, socket and transparent-mode values

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod protocol;
pub mod timer;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{Interrupts, Modem, ModemBuilder, ReplyWait, WaitStatus};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{
    DefaultHandler, DefaultReceiveHandler, Event, EventHandler, EventQueue, QueueItem,
    ReceiveHandler, dispatch_default,
};
pub use protocol::{RawEvent, UrcKind};
pub use timer::TimeoutCounter;
pub use transport::{Board, Pin, RingEdge, SerialBoard, SerialConfig, list_ports};
pub use types::{
    AccessMode, Auth, Carrier, ConnectId, ContextId, ContextType, ModuleInfo, OperatorInfo,
    PdpConfig, PdpContext, PdpStatus, RegistrationStatus, Service, SignalQuality, SocketConfig,
    SocketInfo, SocketState, TransparentState, TransparentStatus,
};

//! Error types for the bg77 library.

use thiserror::Error;

/// The main error type for bg77 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The board failed to write a command or payload to the module.
    #[error("transmit failed: {0}")]
    Transmit(#[source] std::io::Error),

    /// No reply arrived before the timeout elapsed.
    #[error("no reply after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    /// A reply arrived but never contained the expected marker.
    #[error("expected {expected:?} within {timeout_secs}s")]
    DesiredAnswerTimeout {
        expected: String,
        timeout_secs: u32,
    },

    /// A required argument was not supplied.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// A mandatory field could not be extracted from a reply or notification.
    #[error("failed to parse {field}")]
    Parse { field: &'static str },

    /// An identifier is outside the range supported by the module.
    #[error("{what} {value} out of range ({min}-{max})")]
    OutOfRange {
        what: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },

    /// The event queue has no free slot.
    #[error("queue full ({capacity} entries)")]
    QueueFull { capacity: usize },

    /// The event queue holds no entry.
    #[error("queue empty")]
    QueueEmpty,

    /// The module replied with a negative outcome.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Transparent-mode data was written while transparent mode is not active.
    #[error("transparent mode is not active")]
    TransparentModeInactive,
}

/// Result type alias for bg77 operations.
pub type Result<T> = std::result::Result<T, Error>;

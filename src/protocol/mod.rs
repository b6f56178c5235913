//! AT protocol definitions for BG77 communication.
//!
//! - [`command`]: reply markers, the configuration sequence and command timeouts
//! - [`frame`]: command line encoding and reply accumulation
//! - [`urc`]: notification keywords and the receive-event scanner
//! - [`parser`]: delimiter extraction and reply/notification parsers

pub mod command;
pub mod frame;
pub mod parser;
pub mod urc;

pub use command::{CONFIGURATION, ESCAPE_SEQUENCE, MAX_PAYLOAD, timeout};
pub use frame::{ReplyBuffer, encode as encode_command};
pub use parser::{ReadData, field, parse_int};
pub use urc::{RawEvent, UrcKind, scan};

//! AT command vocabulary for the BG77.
//!
//! Commands are ASCII lines terminated with CR+LF. Replies are line-oriented and
//! end with one of the final result markers below, or a notification keyword.

/// Line terminator appended to every command.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Final result of a successful command.
pub const OK: &str = "OK";

/// Final result of a failed command.
pub const ERROR: &str = "ERROR";

/// Reply to a successful switch into transparent mode.
pub const CONNECT: &str = "CONNECT";

/// Carrier-loss marker emitted when a transparent connection drops.
pub const NO_CARRIER: &str = "NO CARRIER";

/// Prefix of socket notifications; also accepted as the end of an escape.
pub const QIURC: &str = "QIURC";

/// Power-down notification accepted in place of `OK` after `AT+QPOWD`.
pub const READY: &str = "RDY";

/// SIM ready marker in the `+CPIN` reply.
pub const SIM_READY: &str = "READY";

/// Data prompt of `AT+QISEND`.
pub const SEND_PROMPT: &str = ">";

/// Final result of a buffered send.
pub const SEND_OK: &str = "SEND OK";

/// Escape sequence that leaves transparent mode. Sent without terminator.
pub const ESCAPE_SEQUENCE: &[u8] = b"+++";

/// Largest payload carried by a notification or a buffer-access read.
pub const MAX_PAYLOAD: usize = 1024;

/// Bytes requested per `AT+QIRD`.
pub const READ_LENGTH: usize = 1500;

/// Configuration lines written once after power-on.
///
/// URCs are routed to the main UART, the ring indicator pulses only for
/// notifications other than calls and SMS, and the module is restricted to
/// LTE-M with an explicit band mask.
pub const CONFIGURATION: &[&str] = &[
    "ATE0",
    "AT+QURCCFG=\"urcport\",\"uart1\"",
    "AT+QCFG=\"risignaltype\",\"respective\"",
    "AT+QCFG=\"urc/ri/ring\",\"off\"",
    "AT+QCFG=\"urc/ri/smsincoming\",\"off\"",
    "AT+QCFG=\"urc/ri/other\",\"pulse\",80,1",
    "AT+QCFG=\"urc/delay\",100",
    "AT+CEREG=2",
    "AT+QCFG=\"nwscanseq\",020301",
    "AT+QCFG=\"iotopmode\",2,1",
    "AT+QCFG=\"band\",0,800000A,1",
    "AT+COPS=3,2",
    "AT&W0",
];

/// Per-command reply timeouts, in seconds.
pub mod timeout {
    /// Simple queries and configuration writes.
    pub const SHORT: u32 = 5;
    /// Status queries.
    pub const QUERY: u32 = 10;
    /// `AT+QIRD`.
    pub const READ: u32 = 15;
    /// `AT+QIOPEN`, `AT+QICLOSE`, `AT+QIACT`, `AT+QIDEACT`.
    pub const SOCKET: u32 = 30;
    /// `AT+QICSGP`.
    pub const PDP_CONFIG: u32 = 40;
    /// `AT+COPS=2`.
    pub const DETACH: u32 = 90;
    /// `AT+COPS=4,...`.
    pub const ATTACH: u32 = 180;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_starts_with_echo_off() {
        assert_eq!(CONFIGURATION.first(), Some(&"ATE0"));
        assert_eq!(CONFIGURATION.last(), Some(&"AT&W0"));
        assert!(CONFIGURATION.iter().all(|line| line.starts_with("AT")));
    }

    #[test]
    fn test_escape_has_no_terminator() {
        assert_eq!(ESCAPE_SEQUENCE, b"+++");
        assert!(!ESCAPE_SEQUENCE.ends_with(LINE_TERMINATOR));
    }
}

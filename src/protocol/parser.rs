//! Text field extraction for BG77 replies and notifications.
//!
//! Notifications are parsed with delimiter-bounded [`field`] lookups on the raw
//! payload. Command replies are parsed line-wise: the line that starts with the
//! reply prefix is split on commas.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::command::MAX_PAYLOAD;
use crate::protocol::frame::find;
use crate::types::{
    ConnectId, ContextId, ContextType, OperatorInfo, PdpConfig, PdpStatus, RegistrationStatus,
    SignalQuality, SocketInfo, SocketState,
};

/// Returns the bytes between the first `open` and the following `close`.
///
/// When `open` and `close` are the same delimiter the closing search skips the
/// first byte of the field, so a field is never empty in that case. Returns
/// `None` if either delimiter is missing.
#[must_use]
pub fn field(src: &[u8], open: u8, close: u8) -> Option<&[u8]> {
    let start = src.iter().position(|&b| b == open)? + 1;
    let search_from = if open == close { start + 1 } else { start };
    let rest = src.get(search_from..)?;
    let end = search_from + rest.iter().position(|&b| b == close)?;
    Some(&src[start..end])
}

/// Parses a leading decimal integer, ignoring leading whitespace and trailing bytes.
#[must_use]
pub fn parse_int(bytes: &[u8]) -> Option<i32> {
    let bytes = bytes.trim_ascii_start();
    let sign_len = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let digits = bytes[sign_len..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    std::str::from_utf8(&bytes[..sign_len + digits])
        .ok()?
        .parse()
        .ok()
}

fn parse_u8(bytes: &[u8], field: &'static str) -> Result<u8> {
    parse_int(bytes)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(Error::Parse { field })
}

fn parse_u16(bytes: &[u8]) -> Option<u16> {
    parse_int(bytes).and_then(|n| u16::try_from(n).ok())
}

/// Trims whitespace and surrounding double quotes.
fn unquote(bytes: &[u8]) -> String {
    let trimmed = bytes.trim_ascii();
    let inner = trimmed
        .strip_prefix(b"\"")
        .and_then(|s| s.strip_suffix(b"\""))
        .unwrap_or(trimmed);
    String::from_utf8_lossy(inner).into_owned()
}

/// Comma-separated fields of the line that starts with `prefix`.
fn line_fields<'a>(reply: &'a [u8], prefix: &[u8]) -> Option<Vec<&'a [u8]>> {
    let start = find(reply, prefix)? + prefix.len();
    let rest = &reply[start..];
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    Some(
        rest[..end]
            .split(|&b| b == b',')
            .map(<[u8]>::trim_ascii)
            .collect(),
    )
}

// Notifications

/// Connection id of a `closed` notification (`closed",<id>\r\n`).
pub fn parse_closed(payload: &[u8]) -> Result<ConnectId> {
    let id = field(payload, b',', b'\n').ok_or(Error::Parse {
        field: "closed connect id",
    })?;
    ConnectId::new(parse_u8(id, "closed connect id")?)
}

/// Connection and server id of an `incoming` notification.
///
/// Format: `incoming",<connectID>,<serverID>,<remote IP>,<remote port>`.
pub fn parse_incoming(payload: &[u8]) -> Result<(ConnectId, ConnectId)> {
    let connect = field(payload, b',', b',').ok_or(Error::Parse {
        field: "incoming connect id",
    })?;
    let connect_id = ConnectId::new(parse_u8(connect, "incoming connect id")?)?;

    let first = payload
        .iter()
        .position(|&b| b == b',')
        .ok_or(Error::Parse {
            field: "incoming server id",
        })?;
    let second = first
        + 1
        + payload[first + 1..]
            .iter()
            .position(|&b| b == b',')
            .ok_or(Error::Parse {
                field: "incoming server id",
            })?;
    let server = field(&payload[second..], b',', b',').ok_or(Error::Parse {
        field: "incoming server id",
    })?;
    let server_id = ConnectId::new(parse_u8(server, "incoming server id")?)?;

    Ok((connect_id, server_id))
}

/// Connection id of a `recv` notification (`recv",<id>\r\n`).
pub fn parse_recv(payload: &[u8]) -> Result<ConnectId> {
    let id = field(payload, b',', b'\n').ok_or(Error::Parse {
        field: "recv connect id",
    })?;
    ConnectId::new(parse_u8(id, "recv connect id")?)
}

/// Context id of a `pdpdeact` notification (`pdpdeact",<ctx>\r\n`).
pub fn parse_pdp_deactivated(payload: &[u8]) -> Result<ContextId> {
    let id = field(payload, b',', b'\n').ok_or(Error::Parse {
        field: "pdpdeact context id",
    })?;
    ContextId::new(parse_u8(id, "pdpdeact context id")?)
}

// Command replies

/// Data returned by `AT+QIRD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadData {
    /// Received bytes, at most [`MAX_PAYLOAD`].
    pub data: Bytes,
    /// The module reported more than [`MAX_PAYLOAD`] bytes.
    pub overflow: bool,
}

/// Parses `+QIRD: <len>\r\n<data>\r\n\r\nOK`.
///
/// Bytes before the `+QIRD:` line, such as a notification that arrived during
/// the read, are skipped.
pub fn parse_read(reply: &[u8]) -> Result<ReadData> {
    const PREFIX: &[u8] = b"+QIRD:";

    let start = find(reply, PREFIX).ok_or(Error::Parse {
        field: "read length",
    })? + PREFIX.len();
    let line = &reply[start..];

    let reported = parse_int(line)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(Error::Parse {
            field: "read length",
        })?;

    let overflow = reported > MAX_PAYLOAD;
    let len = reported.min(MAX_PAYLOAD);

    let data = match line.iter().position(|&b| b == b'\n') {
        Some(newline) => {
            let body = &line[newline + 1..];
            Bytes::copy_from_slice(&body[..len.min(body.len())])
        }
        None => Bytes::new(),
    };

    Ok(ReadData { data, overflow })
}

/// Registration state from `+CEREG: <n>,<stat>[,...]`.
pub fn parse_registration(reply: &[u8]) -> Result<RegistrationStatus> {
    let fields = line_fields(reply, b"+CEREG:").ok_or(Error::Parse {
        field: "registration status",
    })?;
    let stat = fields.get(1).ok_or(Error::Parse {
        field: "registration status",
    })?;
    Ok(RegistrationStatus::from_digit(parse_u8(stat, "registration status")?))
}

/// Operator selection from `+COPS: <mode>,<format>,"<oper>",<AcT>`.
///
/// Returns `None` when no operator is selected (`+COPS: 0`).
#[must_use]
pub fn parse_operator(reply: &[u8]) -> Option<OperatorInfo> {
    let fields = line_fields(reply, b"+COPS:")?;
    if fields.len() < 3 {
        return None;
    }

    Some(OperatorInfo {
        mode: parse_int(fields[0]).and_then(|n| u8::try_from(n).ok())?,
        operator: unquote(fields[2]),
        access_technology: fields
            .get(3)
            .and_then(|f| parse_int(f))
            .and_then(|n| u8::try_from(n).ok())
            .unwrap_or(0),
    })
}

/// Context settings from `+QICSGP: <type>,"<apn>","<user>","<pwd>",<auth>`.
#[must_use]
pub fn parse_pdp_config(reply: &[u8]) -> Option<PdpConfig> {
    let fields = line_fields(reply, b"+QICSGP:")?;
    if fields.len() < 2 {
        return None;
    }

    let text = |index: usize| fields.get(index).map(|f| unquote(f)).unwrap_or_default();
    Some(PdpConfig {
        apn: text(1),
        user: text(2),
        password: text(3),
        auth: text(4),
    })
}

/// State of `context_id` from `+QIACT: <ctx>,<state>,<type>,"<addr>"` lines.
#[must_use]
pub fn parse_pdp_status(reply: &[u8], context_id: ContextId) -> PdpStatus {
    let prefix = format!("+QIACT: {context_id},");
    let Some(fields) = line_fields(reply, prefix.as_bytes()) else {
        return PdpStatus::Inactive;
    };

    if fields.first().and_then(|f| parse_int(f)) != Some(1) {
        return PdpStatus::Inactive;
    }

    PdpStatus::Active {
        context_type: fields
            .get(1)
            .and_then(|f| parse_int(f))
            .and_then(|n| u8::try_from(n).ok())
            .and_then(ContextType::from_digit),
        address: fields.get(2).map(|f| unquote(f)).unwrap_or_default(),
    }
}

/// Socket line for `connect_id` from `+QISTATE: <id>,"<type>","<ip>",<rport>,<lport>,<state>,...`.
#[must_use]
pub fn parse_socket_info(reply: &[u8], connect_id: ConnectId) -> Option<SocketInfo> {
    let prefix = format!("+QISTATE: {connect_id},");
    let fields = line_fields(reply, prefix.as_bytes())?;
    if fields.len() < 5 {
        return None;
    }

    let state = parse_int(fields[4])
        .and_then(|n| u8::try_from(n).ok())
        .and_then(SocketState::from_digit)?;

    Some(SocketInfo {
        connect_id,
        service_type: unquote(fields[0]),
        address: unquote(fields[1]),
        remote_port: parse_u16(fields[2]).unwrap_or(0),
        local_port: parse_u16(fields[3]).unwrap_or(0),
        state,
    })
}

/// Serving-cell report from `+QCSQ: "<sysmode>",<rssi>,<rsrp>,<sinr>,<rsrq>`.
pub fn parse_signal(reply: &[u8]) -> Result<SignalQuality> {
    let fields = line_fields(reply, b"+QCSQ:").ok_or(Error::Parse { field: "signal" })?;
    if fields.len() < 5 {
        return Err(Error::Parse { field: "signal" });
    }

    let value = |index: usize| parse_int(fields[index]).ok_or(Error::Parse { field: "signal" });
    Ok(SignalQuality {
        system_mode: unquote(fields[0]),
        rssi: value(1)?,
        rsrp: value(2)?,
        sinr: SignalQuality::sinr_from_raw(value(3)?),
        rsrq: value(4)?,
    })
}

/// Text between `open` and the end of that line, trimmed.
///
/// `AT+GMR` and `AT+GSN` answer on their own line (`open = b'\n'`),
/// `AT+QCCID` after a prefix (`open = b' '`).
#[must_use]
pub fn parse_identity(reply: &[u8], open: u8) -> Option<String> {
    let value = field(reply, open, b'\n')?.trim_ascii();
    if value.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(value).into_owned())
}

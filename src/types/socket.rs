//! Socket configuration and status types.

use crate::types::ids::{ConnectId, ContextId};

/// Address used for the unused remote end of a listening socket.
pub const SERVER_REMOTE_ADDRESS: &str = "127.0.0.1";

/// Data access mode of a socket, as passed to `AT+QIOPEN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessMode {
    /// Data is exchanged with `AT+QISEND` / `AT+QIRD`.
    #[default]
    Buffer = 0,
    /// The socket starts directly in transparent mode.
    Transparent = 2,
}

/// Role of a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Service {
    /// TCP client connecting to a remote host.
    Client {
        /// Remote address or domain name.
        address: String,
        /// Remote port.
        remote_port: u16,
    },
    /// TCP listener accepting connections on a local port.
    Server {
        /// Local port.
        local_port: u16,
    },
}

/// Parameters for opening a socket with `AT+QIOPEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// PDP context the socket is bound to.
    pub context_id: ContextId,
    /// Connection slot.
    pub connect_id: ConnectId,
    /// Client or server role.
    pub service: Service,
    /// Data access mode.
    pub access_mode: AccessMode,
}

impl SocketConfig {
    /// TCP client in buffer-access mode.
    #[must_use]
    pub fn client(
        context_id: ContextId,
        connect_id: ConnectId,
        address: impl Into<String>,
        remote_port: u16,
    ) -> Self {
        Self {
            context_id,
            connect_id,
            service: Service::Client {
                address: address.into(),
                remote_port,
            },
            access_mode: AccessMode::Buffer,
        }
    }

    /// TCP listener in buffer-access mode.
    #[must_use]
    pub const fn server(context_id: ContextId, connect_id: ConnectId, local_port: u16) -> Self {
        Self {
            context_id,
            connect_id,
            service: Service::Server { local_port },
            access_mode: AccessMode::Buffer,
        }
    }

    /// Sets the access mode.
    #[must_use]
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }
}

/// Socket state reported by `+QISTATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// Not yet connected.
    Initial,
    /// Connecting.
    Opening,
    /// Connected.
    Connected,
    /// Listening for incoming connections.
    Listening,
    /// Closing.
    Closing,
}

impl SocketState {
    /// Maps the `<socket_state>` digit.
    #[must_use]
    pub const fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Initial),
            1 => Some(Self::Opening),
            2 => Some(Self::Connected),
            3 => Some(Self::Listening),
            4 => Some(Self::Closing),
            _ => None,
        }
    }

    /// Returns false for the initial and closing states.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Initial | Self::Closing)
    }
}

/// One `+QISTATE` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketInfo {
    /// Connection slot.
    pub connect_id: ConnectId,
    /// Service type, quotes removed (`TCP`, `TCP LISTENER`, ...).
    pub service_type: String,
    /// Remote or local address, quotes removed.
    pub address: String,
    /// Remote port.
    pub remote_port: u16,
    /// Local port.
    pub local_port: u16,
    /// Socket state.
    pub state: SocketState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_state_open() {
        assert!(!SocketState::Initial.is_open());
        assert!(SocketState::Opening.is_open());
        assert!(SocketState::Connected.is_open());
        assert!(SocketState::Listening.is_open());
        assert!(!SocketState::Closing.is_open());
        assert_eq!(SocketState::from_digit(7), None);
    }

    #[test]
    fn test_socket_config_builders() {
        let ctx = ContextId::new(1).unwrap();
        let id = ConnectId::new(2).unwrap();

        let client = SocketConfig::client(ctx, id, "10.0.0.1", 2001)
            .access_mode(AccessMode::Transparent);
        assert_eq!(client.access_mode, AccessMode::Transparent);
        assert!(matches!(client.service, Service::Client { remote_port: 2001, .. }));

        let server = SocketConfig::server(ctx, id, 2000);
        assert_eq!(server.service, Service::Server { local_port: 2000 });
        assert_eq!(server.access_mode, AccessMode::Buffer);
    }
}

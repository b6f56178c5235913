//! Data types for BG77 entities.
//!
//! This module contains the data structures used throughout the library:
//! - Range-checked connection and context identifiers
//! - Transparent-mode state
//! - Network registration, PDP contexts and signal reports
//! - Socket configuration and status
//! - Module identification

pub mod device;
pub mod ids;
pub mod network;
pub mod socket;
pub mod transparent;

pub use device::ModuleInfo;
pub use ids::{ConnectId, ContextId};
pub use network::{
    Auth, ContextType, OperatorInfo, PdpConfig, PdpContext, PdpStatus, RegistrationStatus,
    SignalQuality,
};
pub use socket::{AccessMode, SERVER_REMOTE_ADDRESS, Service, SocketConfig, SocketInfo, SocketState};
pub use transparent::{Carrier, TransparentState, TransparentStatus};

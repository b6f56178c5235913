//! Network registration, PDP context and signal types.

use std::fmt;

use crate::types::ids::ContextId;

/// EPS registration state reported by `+CEREG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Not registered, not searching.
    NotRegistered,
    /// Registered on the home network.
    Home,
    /// Not registered, searching for an operator.
    Searching,
    /// Registration denied.
    Denied,
    /// Unknown (for example out of coverage).
    Unknown,
    /// Registered, roaming.
    Roaming,
}

impl RegistrationStatus {
    /// Maps the `<stat>` digit of `+CEREG`.
    #[must_use]
    pub const fn from_digit(digit: u8) -> Self {
        match digit {
            0 => Self::NotRegistered,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            5 => Self::Roaming,
            _ => Self::Unknown,
        }
    }

    /// Returns true when the module is attached (home or roaming).
    #[must_use]
    pub const fn is_attached(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// Operator selection reported by `AT+COPS?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorInfo {
    /// Selection mode (0 automatic, 1 manual, 2 deregistered, 4 manual/automatic).
    pub mode: u8,
    /// Operator in numeric format, quotes removed.
    pub operator: String,
    /// Access technology (0 GSM, 8 eMTC, 9 NB-IoT).
    pub access_technology: u8,
}

impl OperatorInfo {
    /// Human-readable selection mode.
    #[must_use]
    pub const fn mode_name(&self) -> &'static str {
        match self.mode {
            0 => "automatic",
            1 => "manual",
            2 => "deregistered",
            4 => "manual/automatic",
            _ => "unknown",
        }
    }

    /// Human-readable access technology.
    #[must_use]
    pub const fn access_technology_name(&self) -> &'static str {
        match self.access_technology {
            0 => "GSM",
            7 => "E-UTRAN",
            8 => "eMTC",
            9 => "NB-IoT",
            _ => "unknown",
        }
    }
}

/// IP protocol type of a PDP context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ContextType {
    /// IPv4 only.
    #[default]
    Ipv4 = 1,
    /// IPv6 only.
    Ipv6 = 2,
    /// Dual stack.
    Ipv4v6 = 3,
}

impl ContextType {
    /// Maps the numeric context type of `+QIACT`.
    #[must_use]
    pub const fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(Self::Ipv4),
            2 => Some(Self::Ipv6),
            3 => Some(Self::Ipv4v6),
            _ => None,
        }
    }
}

/// Authentication method of a PDP context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Auth {
    /// No authentication.
    #[default]
    None = 0,
    /// PAP.
    Pap = 1,
    /// CHAP.
    Chap = 2,
    /// PAP or CHAP.
    PapOrChap = 3,
}

/// Parameters written with `AT+QICSGP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdpContext {
    /// Context to configure.
    pub context_id: ContextId,
    /// IP protocol type.
    pub context_type: ContextType,
    /// Access point name.
    pub apn: String,
    /// User name (may be empty).
    pub user: String,
    /// Password (may be empty).
    pub password: String,
    /// Authentication method.
    pub auth: Auth,
}

impl PdpContext {
    /// Creates an IPv4 context without authentication.
    #[must_use]
    pub fn new(context_id: ContextId, apn: impl Into<String>) -> Self {
        Self {
            context_id,
            context_type: ContextType::Ipv4,
            apn: apn.into(),
            user: String::new(),
            password: String::new(),
            auth: Auth::None,
        }
    }

    /// Sets the credentials and authentication method.
    #[must_use]
    pub fn credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
        auth: Auth,
    ) -> Self {
        self.user = user.into();
        self.password = password.into();
        self.auth = auth;
        self
    }
}

/// Context configuration read back with `AT+QICSGP=<ctx>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdpConfig {
    /// Access point name.
    pub apn: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// Authentication method as reported.
    pub auth: String,
}

/// Activation state of a PDP context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdpStatus {
    /// The context is active.
    Active {
        /// Reported IP protocol type.
        context_type: Option<ContextType>,
        /// Local address, quotes removed.
        address: String,
    },
    /// The context is not active.
    Inactive,
}

impl PdpStatus {
    /// Returns true for [`PdpStatus::Active`].
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Serving-cell signal report from `AT+QCSQ`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuality {
    /// Serving system mode, for example `"eMTC"`.
    pub system_mode: String,
    /// RSSI in dBm.
    pub rssi: i32,
    /// RSRP in dBm.
    pub rsrp: i32,
    /// SINR in dB, converted from the raw report.
    pub sinr: f32,
    /// RSRQ in dB.
    pub rsrq: i32,
}

impl SignalQuality {
    /// Minimum RSRP considered usable.
    pub const MIN_RSRP: i32 = -115;

    /// Converts the raw SINR report (0-250) to dB.
    #[must_use]
    pub fn sinr_from_raw(raw: i32) -> f32 {
        raw as f32 / 2.0 - 23.5
    }

    /// Returns true when RSRP and SINR are good enough to open connections.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.rsrp >= Self::MIN_RSRP && self.sinr >= 0.0
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rssi={} rsrp={} sinr={:.1} rsrq={}",
            self.system_mode, self.rssi, self.rsrp, self.sinr, self.rsrq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_attached() {
        assert!(RegistrationStatus::from_digit(1).is_attached());
        assert!(RegistrationStatus::from_digit(5).is_attached());
        assert!(!RegistrationStatus::from_digit(2).is_attached());
        assert_eq!(RegistrationStatus::from_digit(9), RegistrationStatus::Unknown);
    }

    #[test]
    fn test_sinr_conversion() {
        assert!((SignalQuality::sinr_from_raw(47) - 0.0).abs() < f32::EPSILON);
        assert!((SignalQuality::sinr_from_raw(67) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_signal_acceptable() {
        let mut signal = SignalQuality {
            system_mode: "eMTC".into(),
            rssi: -70,
            rsrp: -100,
            sinr: 3.0,
            rsrq: -10,
        };
        assert!(signal.is_acceptable());

        signal.rsrp = -120;
        assert!(!signal.is_acceptable());

        signal.rsrp = -100;
        signal.sinr = -1.5;
        assert!(!signal.is_acceptable());
    }

    #[test]
    fn test_pdp_context_builder() {
        let ctx = PdpContext::new(ContextId::new(1).unwrap(), "internet").credentials(
            "user",
            "secret",
            Auth::Chap,
        );
        assert_eq!(ctx.apn, "internet");
        assert_eq!(ctx.auth, Auth::Chap);
        assert_eq!(ctx.context_type, ContextType::Ipv4);
    }
}

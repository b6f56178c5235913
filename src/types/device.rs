//! Module identification types.

/// Identification strings read from the module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Firmware revision (`AT+GMR`).
    pub firmware: String,
    /// SIM card ICCID (`AT+QCCID`).
    pub iccid: String,
    /// Module IMEI (`AT+GSN`).
    pub imei: String,
}

//! Board-support layer for BG77 communication.
//!
//! The driver never performs raw I/O itself. A [`Board`] transmits bytes, drives
//! the module's control pins, sleeps, and resets the host. Receive, tick and
//! ring-indicator events flow the other way, through the
//! [`Interrupts`](crate::Interrupts) handle passed to [`Board::attach`].

#[cfg(test)]
pub(crate) mod mock;
pub mod serial;

use std::io;

use crate::client::Interrupts;

/// Control pins of the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// `PWRKEY`, pulsed to switch the module on or off.
    PowerKey,
    /// `RESET_N`.
    Reset,
}

/// Edge seen on the module's `MAIN_RI` ring-indicator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingEdge {
    /// High to low: the module signals a notification.
    Falling,
    /// Low to high.
    Rising,
}

/// Hardware collaborator consumed by the driver.
pub trait Board {
    /// Writes raw bytes to the module.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the write fails.
    fn transmit(&mut self, data: &[u8]) -> io::Result<()>;

    /// Drives a control pin high (`true`) or low.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin is not wired on this board.
    fn write_pin(&mut self, pin: Pin, high: bool) -> io::Result<()>;

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Resets the host side after the module could not be powered on.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset itself fails.
    fn reset_device(&mut self) -> io::Result<()>;

    /// Connects the board's event sources to the driver.
    ///
    /// Called once when the driver is built.
    fn attach(&mut self, interrupts: &Interrupts) {
        let _ = interrupts;
    }

    /// Called between polls of a blocking wait.
    fn relax(&mut self) {
        std::hint::spin_loop();
    }
}

pub use serial::{SerialBoard, SerialConfig, list_ports};

//! Driver configuration.

/// Default number of tick callbacks per second (1 ms tick).
pub const DEFAULT_TICKS_PER_SECOND: u32 = 1000;

/// Default timeout for an expected marker after a reply, in seconds.
pub const DEFAULT_ANSWER_TIMEOUT_SECS: u32 = 20;

/// Default timeout for slow markers such as `SEND OK`, in seconds.
pub const DEFAULT_LONG_ANSWER_TIMEOUT_SECS: u32 = 40;

/// Default guard time before and after the `+++` escape sequence.
pub const DEFAULT_ESCAPE_GUARD_BEFORE_MS: u32 = 2000;
pub const DEFAULT_ESCAPE_GUARD_AFTER_MS: u32 = 1000;

/// Default number of power-on attempts before the board is reset.
pub const DEFAULT_POWER_ON_ATTEMPTS: u8 = 3;

/// Default number of receive events buffered for the transaction engine.
pub const DEFAULT_REPLY_CAPACITY: usize = 64;

/// Configuration for the modem driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tick callbacks that make up one second of the timeout counter.
    pub ticks_per_second: u32,
    /// Timeout for an expected marker (`OK`, `CONNECT`, `>`), in seconds.
    pub answer_timeout_secs: u32,
    /// Timeout for slow markers (`SEND OK`), in seconds.
    pub long_answer_timeout_secs: u32,
    /// Silence before the escape sequence, in milliseconds.
    pub escape_guard_before_ms: u32,
    /// Silence after the escape sequence, in milliseconds.
    pub escape_guard_after_ms: u32,
    /// Power-on attempts during [`init`](crate::Modem::init) before resetting the board.
    pub power_on_attempts: u8,
    /// Value written with `AT+QICFG="transwaittm"` before entering transparent mode.
    pub transparent_wait_time: u8,
    /// Receive events kept for the transaction engine before new ones are dropped.
    pub reply_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            answer_timeout_secs: DEFAULT_ANSWER_TIMEOUT_SECS,
            long_answer_timeout_secs: DEFAULT_LONG_ANSWER_TIMEOUT_SECS,
            escape_guard_before_ms: DEFAULT_ESCAPE_GUARD_BEFORE_MS,
            escape_guard_after_ms: DEFAULT_ESCAPE_GUARD_AFTER_MS,
            power_on_attempts: DEFAULT_POWER_ON_ATTEMPTS,
            transparent_wait_time: 0,
            reply_capacity: DEFAULT_REPLY_CAPACITY,
        }
    }

    /// Sets the tick rate. Zero is treated as one tick per second.
    #[must_use]
    pub const fn ticks_per_second(mut self, ticks: u32) -> Self {
        self.ticks_per_second = if ticks == 0 { 1 } else { ticks };
        self
    }

    /// Sets the expected-marker timeout.
    #[must_use]
    pub const fn answer_timeout_secs(mut self, secs: u32) -> Self {
        self.answer_timeout_secs = secs;
        self
    }

    /// Sets the slow-marker timeout.
    #[must_use]
    pub const fn long_answer_timeout_secs(mut self, secs: u32) -> Self {
        self.long_answer_timeout_secs = secs;
        self
    }

    /// Sets the guard times around the escape sequence.
    #[must_use]
    pub const fn escape_guard_ms(mut self, before: u32, after: u32) -> Self {
        self.escape_guard_before_ms = before;
        self.escape_guard_after_ms = after;
        self
    }

    /// Sets the number of power-on attempts. Zero is treated as one.
    #[must_use]
    pub const fn power_on_attempts(mut self, attempts: u8) -> Self {
        self.power_on_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Sets the transparent-mode wait time (0-20, in 100 ms units).
    #[must_use]
    pub const fn transparent_wait_time(mut self, wait: u8) -> Self {
        self.transparent_wait_time = wait;
        self
    }

    /// Sets the reply hand-off capacity. Zero is treated as one.
    #[must_use]
    pub const fn reply_capacity(mut self, capacity: usize) -> Self {
        self.reply_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.ticks_per_second, 1000);
        assert_eq!(config.answer_timeout_secs, 20);
        assert_eq!(config.long_answer_timeout_secs, 40);
        assert_eq!(config.escape_guard_before_ms, 2000);
        assert_eq!(config.escape_guard_after_ms, 1000);
        assert_eq!(config.power_on_attempts, 3);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .ticks_per_second(10)
            .answer_timeout_secs(2)
            .escape_guard_ms(0, 0)
            .power_on_attempts(0)
            .reply_capacity(0);
        assert_eq!(config.ticks_per_second, 10);
        assert_eq!(config.answer_timeout_secs, 2);
        assert_eq!(config.escape_guard_before_ms, 0);
        assert_eq!(config.power_on_attempts, 1);
        assert_eq!(config.reply_capacity, 1);
    }
}

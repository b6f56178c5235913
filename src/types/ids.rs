//! Range-checked identifiers for connections and PDP contexts.

use std::fmt;

use crate::error::{Error, Result};

/// Identifier of one of the module's socket connections (0-11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectId(u8);

impl ConnectId {
    /// Lowest connection id supported by the module.
    pub const MIN: u8 = 0;
    /// Highest connection id supported by the module.
    pub const MAX: u8 = 11;

    /// Creates a connection id, rejecting values outside 0-11.
    pub const fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(Error::OutOfRange {
                what: "connect id",
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ConnectId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for ConnectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a PDP context (1-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u8);

impl ContextId {
    /// Lowest context id supported by the module.
    pub const MIN: u8 = 1;
    /// Highest context id supported by the module.
    pub const MAX: u8 = 7;

    /// Creates a context id, rejecting values outside 1-7.
    pub const fn new(value: u8) -> Result<Self> {
        if value < Self::MIN || value > Self::MAX {
            return Err(Error::OutOfRange {
                what: "context id",
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ContextId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_id_range() {
        assert_eq!(ConnectId::new(0).unwrap().get(), 0);
        assert_eq!(ConnectId::new(11).unwrap().get(), 11);
        assert!(matches!(
            ConnectId::new(12),
            Err(Error::OutOfRange { value: 12, .. })
        ));
        assert!(ConnectId::try_from(200).is_err());
    }

    #[test]
    fn test_context_id_range() {
        assert!(ContextId::new(0).is_err());
        assert_eq!(ContextId::new(1).unwrap().get(), 1);
        assert_eq!(ContextId::new(7).unwrap().get(), 7);
        assert!(ContextId::new(8).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectId::new(3).unwrap().to_string(), "3");
        assert_eq!(ContextId::new(1).unwrap().to_string(), "1");
    }
}

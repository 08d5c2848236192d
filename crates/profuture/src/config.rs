//! Configuration for the bounded-concurrency runner

use std::fmt::{self, Display};
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// The maximum number of tasks a [`Concurrency`](crate::Concurrency) run keeps in flight.
///
/// A limit is always positive; zero is rejected when the limit is built, so a
/// run can never start with a cap that would stall it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ConcurrencyLimit(NonZeroUsize);

impl ConcurrencyLimit {
    /// A limit of one, which makes a concurrent run behave like a sequential one
    pub const SERIAL: Self = Self(NonZeroUsize::MIN);

    /// Create a limit, rejecting zero
    pub fn new(value: usize) -> ConfigResult<Self> {
        NonZeroUsize::new(value)
            .map(Self)
            .ok_or_else(|| ConfigError::invalid_concurrency_limit(value))
    }

    /// Get the limit as a plain integer
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ConcurrencyLimit {
    /// Use the available parallelism of the machine, falling back to one.
    fn default() -> Self {
        Self(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }
}

impl From<NonZeroUsize> for ConcurrencyLimit {
    fn from(value: NonZeroUsize) -> Self {
        Self(value)
    }
}

impl TryFrom<usize> for ConcurrencyLimit {
    type Error = ConfigError;

    fn try_from(value: usize) -> ConfigResult<Self> {
        Self::new(value)
    }
}

impl From<ConcurrencyLimit> for usize {
    fn from(limit: ConcurrencyLimit) -> Self {
        limit.get()
    }
}

impl Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_validation() {
        assert_eq!(ConcurrencyLimit::new(4).unwrap().get(), 4);
        assert_eq!(
            ConcurrencyLimit::new(0),
            Err(ConfigError::InvalidConcurrencyLimit { value: 0 })
        );
        assert_eq!(ConcurrencyLimit::SERIAL.get(), 1);
    }

    #[test]
    fn test_default_is_positive() {
        assert!(ConcurrencyLimit::default().get() >= 1);
    }

    #[test]
    fn test_conversions() {
        let limit = ConcurrencyLimit::try_from(8).unwrap();
        assert_eq!(usize::from(limit), 8);
        assert_eq!(limit.to_string(), "8");

        let non_zero = NonZeroUsize::new(3).unwrap();
        assert_eq!(ConcurrencyLimit::from(non_zero).get(), 3);
        assert!(ConcurrencyLimit::try_from(0).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let limit = ConcurrencyLimit::new(2).unwrap();
        let json = serde_json::to_string(&limit).unwrap();
        assert_eq!(json, "2");

        let parsed: ConcurrencyLimit = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, limit);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        let err = serde_json::from_str::<ConcurrencyLimit>("0").unwrap_err();
        assert!(err.to_string().contains("must be > 0"));
    }
}

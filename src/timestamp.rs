//! Unix timestamp type for payment authorization windows.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::{SystemTime, SystemTimeError};

/// A Unix timestamp represented as a `u64`, used in payment authorization windows.
///
/// This type encodes the number of seconds since the Unix epoch (1970-01-01T00:00:00Z).
/// It is used in time-bounded ERC-3009 `transferWithAuthorization` messages to specify
/// the validity window (`validAfter` and `validBefore`) of a payment authorization.
///
/// Serialized as a stringified integer to avoid loss of precision in JSON.
/// For example, `1699999999` becomes `"1699999999"` in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnixTimestamp(pub u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let ts = s
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))?;
        Ok(UnixTimestamp(ts))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0.saturating_add(rhs))
    }
}

impl From<UnixTimestamp> for alloy::primitives::U256 {
    fn from(value: UnixTimestamp) -> Self {
        alloy::primitives::U256::from(value.0)
    }
}

impl UnixTimestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time, propagating a clock read failure.
    pub fn try_now() -> Result<Self, SystemTimeError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        Ok(Self(now))
    }

    /// Current wall-clock time. Panics only if the system clock reads before
    /// the Unix epoch.
    pub fn now() -> Self {
        Self::try_now().expect("system clock before UNIX epoch")
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_decimal_string() {
        let ts = UnixTimestamp(1700003600);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"1700003600\"");
        let back: UnixTimestamp = serde_json::from_str("\"1700003600\"").unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(serde_json::from_str::<UnixTimestamp>("\"soon\"").is_err());
        assert!(serde_json::from_str::<UnixTimestamp>("\"-5\"").is_err());
        assert!(serde_json::from_str::<UnixTimestamp>("1700003600").is_err());
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Negotiated MSP API version (major.minor.patch).
///
/// Ordering is lexicographic over the triple, which is what every
/// version gate in the schema tables relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ApiVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl ApiVersion {
    /// Placeholder before negotiation; every gate evaluates false.
    pub const UNKNOWN: Self = Self::new(0, 0, 0);

    pub const V1_6: Self = Self::new(1, 6, 0);
    pub const V1_7: Self = Self::new(1, 7, 0);
    pub const V1_8: Self = Self::new(1, 8, 0);
    pub const V1_10: Self = Self::new(1, 10, 0);
    pub const V1_12: Self = Self::new(1, 12, 0);
    pub const V1_15: Self = Self::new(1, 15, 0);
    pub const V1_16: Self = Self::new(1, 16, 0);
    pub const V1_17: Self = Self::new(1, 17, 0);
    pub const V1_19: Self = Self::new(1, 19, 0);
    pub const V1_20: Self = Self::new(1, 20, 0);
    pub const V1_21: Self = Self::new(1, 21, 0);
    pub const V1_23: Self = Self::new(1, 23, 0);
    pub const V1_24: Self = Self::new(1, 24, 0);
    pub const V1_25: Self = Self::new(1, 25, 0);
    pub const V1_26: Self = Self::new(1, 26, 0);
    pub const V1_31: Self = Self::new(1, 31, 0);
    pub const V1_33: Self = Self::new(1, 33, 0);
    pub const V1_34: Self = Self::new(1, 34, 0);
    pub const V1_35: Self = Self::new(1, 35, 0);
    pub const V1_36: Self = Self::new(1, 36, 0);
    pub const V1_37: Self = Self::new(1, 37, 0);
    pub const V1_39: Self = Self::new(1, 39, 0);
    pub const V1_40: Self = Self::new(1, 40, 0);
    pub const V1_41: Self = Self::new(1, 41, 0);
    pub const V1_42: Self = Self::new(1, 42, 0);
    pub const V1_43: Self = Self::new(1, 43, 0);
    pub const V1_44: Self = Self::new(1, 44, 0);

    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// `self >= threshold`.
    pub fn at_least(self, threshold: ApiVersion) -> bool {
        self >= threshold
    }

    /// `self < threshold`.
    pub fn less_than(self, threshold: ApiVersion) -> bool {
        self < threshold
    }

    pub fn is_known(self) -> bool {
        self != Self::UNKNOWN
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error parsing an `ApiVersion` from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid API version {0:?} (expected MAJOR.MINOR[.PATCH])")]
pub struct ParseVersionError(String);

impl FromStr for ApiVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u8, ParseVersionError> {
            match parts.next() {
                Some(part) => part.parse::<u8>().map_err(|_| err()),
                None if required => Err(err()),
                None => Ok(0),
            }
        };
        let version = ApiVersion::new(next(true)?, next(true)?, next(false)?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

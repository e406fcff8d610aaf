// Copyright 2021 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Provides the [`Ttl`] structure for DNS RR TTLs.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

////////////////////////////////////////////////////////////////////////
// TTLS                                                               //
////////////////////////////////////////////////////////////////////////

/// The time to live (TTL) of a managed record.
///
/// [RFC 2181 § 8] clarified that TTL values are unsigned integers
/// between 0 and 2³¹ - 1, inclusive. Managed records additionally must
/// have a non-zero TTL, so a `Ttl` always holds a value in
/// 1..=2³¹ - 1.
///
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Ttl(u32);

/// Reasons a TTL value is rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TtlError {
    Zero,
    TooLarge,
}

impl fmt::Display for TtlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("TTL must be greater than zero"),
            Self::TooLarge => write!(f, "TTL must not exceed {}", i32::MAX),
        }
    }
}

impl std::error::Error for TtlError {}

impl Ttl {
    /// The TTL used when none is given. This matches the `$TTL`
    /// directive written at the top of every rendered zone file.
    pub const DEFAULT: Ttl = Ttl(600);

    /// Creates a `Ttl`, checking that `raw` is in range.
    pub fn new(raw: u32) -> Result<Self, TtlError> {
        if raw == 0 {
            Err(TtlError::Zero)
        } else if raw > i32::MAX as u32 {
            Err(TtlError::TooLarge)
        } else {
            Ok(Self(raw))
        }
    }

    /// Interprets a TTL field from loosely typed input.
    ///
    /// An empty or non-numeric field yields [`Ttl::DEFAULT`]. A numeric
    /// field that is out of range is an error rather than being
    /// silently replaced, since the operator clearly asked for a
    /// specific value.
    pub fn from_input(text: &str) -> Result<Self, TtlError> {
        let text = text.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::DEFAULT);
        }
        // Any digit string too long for a u32 is out of range.
        match text.parse::<u32>() {
            Ok(raw) => Self::new(raw),
            Err(_) => Err(TtlError::TooLarge),
        }
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl fmt::Debug for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for Ttl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Self::new(raw).map_err(de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_ttls_are_not_modified() {
        let i32_max = i32::MAX as u32;
        assert_eq!(u32::from(Ttl::new(1).unwrap()), 1);
        assert_eq!(u32::from(Ttl::new(3600).unwrap()), 3600);
        assert_eq!(u32::from(Ttl::new(i32_max).unwrap()), i32_max);
    }

    #[test]
    fn out_of_range_ttls_are_rejected() {
        assert_eq!(Ttl::new(0), Err(TtlError::Zero));
        assert_eq!(Ttl::new(i32::MAX as u32 + 1), Err(TtlError::TooLarge));
    }

    #[test]
    fn empty_or_non_numeric_input_uses_default() {
        assert_eq!(Ttl::from_input(""), Ok(Ttl::DEFAULT));
        assert_eq!(Ttl::from_input("   "), Ok(Ttl::DEFAULT));
        assert_eq!(Ttl::from_input("1h"), Ok(Ttl::DEFAULT));
        assert_eq!(Ttl::from_input("-5"), Ok(Ttl::DEFAULT));
        assert_eq!(u32::from(Ttl::DEFAULT), 600);
    }

    #[test]
    fn numeric_input_is_range_checked() {
        assert_eq!(Ttl::from_input(" 300 "), Ok(Ttl::new(300).unwrap()));
        assert_eq!(Ttl::from_input("0"), Err(TtlError::Zero));
        assert_eq!(Ttl::from_input("99999999999"), Err(TtlError::TooLarge));
        assert_eq!(
            Ttl::from_input("1234567890123456789012345"),
            Err(TtlError::TooLarge),
        );
        assert_eq!(Ttl::from_input("000"), Err(TtlError::Zero));
    }
}

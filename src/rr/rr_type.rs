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

//! Provides the [`Type`] enumeration for manageable RR types.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::util::Caseless;

////////////////////////////////////////////////////////////////////////
// RR TYPES                                                           //
////////////////////////////////////////////////////////////////////////

/// The RR types that can be managed through the engine.
///
/// Unlike a general-purpose DNS library, we only accept the types an
/// operator is expected to edit by hand. SOA records are generated by
/// the zone renderer and are deliberately absent. Parsing is
/// case-insensitive; displaying always uses the upper-case mnemonic.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Type {
    A,
    Aaaa,
    Caa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Srv,
    Txt,
}

impl Type {
    /// Every manageable type, in mnemonic order.
    pub const ALL: [Type; 9] = [
        Self::A,
        Self::Aaaa,
        Self::Caa,
        Self::Cname,
        Self::Mx,
        Self::Ns,
        Self::Ptr,
        Self::Srv,
        Self::Txt,
    ];

    /// Returns the mnemonic for the type, as used in zone files.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Caa => "CAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Ptr => "PTR",
            Self::Srv => "SRV",
            Self::Txt => "TXT",
        }
    }
}

impl FromStr for Type {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = Caseless(text.trim());
        if let Some(rr_type) = Self::ALL.iter().find(|t| Caseless(t.mnemonic()) == text) {
            Ok(*rr_type)
        } else if text == Caseless("SOA") {
            Err("SOA records are generated and cannot be managed")
        } else {
            Err("unknown or unsupported type")
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.mnemonic())
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_parses_case_insensitively() {
        assert_eq!("cname".parse::<Type>(), Ok(Type::Cname));
        assert_eq!("AaAa".parse::<Type>(), Ok(Type::Aaaa));
        assert_eq!(" mx ".parse::<Type>(), Ok(Type::Mx));
        for rr_type in Type::ALL {
            let lower = rr_type.mnemonic().to_ascii_lowercase();
            assert_eq!(lower.parse::<Type>(), Ok(rr_type));
        }
    }

    #[test]
    fn type_rejects_soa_and_unknown_types() {
        assert_eq!(
            "soa".parse::<Type>(),
            Err("SOA records are generated and cannot be managed"),
        );
        assert!("TYPE65280".parse::<Type>().is_err());
        assert!("".parse::<Type>().is_err());
    }

    #[test]
    fn type_displays_mnemonic() {
        assert_eq!(Type::Aaaa.to_string(), "AAAA");
        assert_eq!(serde_json::to_string(&Type::Txt).unwrap(), "\"TXT\"");
    }
}

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

//! Validated domain names.
//!
//! Two kinds of names appear in a managed zone:
//!
//! * a [`Name`] is an absolute domain name, such as the apex of a zone
//!   (`example.com`); and
//! * an [`Owner`] is the owner field of a record line in a zone file,
//!   which is either `@` (the zone apex), a name relative to the
//!   apex (`www`, `*.dev`, `_dmarc`), or an absolute name written with
//!   a trailing dot.
//!
//! Both are normalized to lower case when parsed, since the DNS
//! compares names case-insensitively and the catalog is keyed by name.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

mod error;
pub use error::Error;

/// The maximum length of the presentation form of a name, excluding the
/// trailing dot. Together with the length octets and the root label,
/// this corresponds to the 255-octet limit of [RFC 1035 § 2.3.4].
///
/// [RFC 1035 § 2.3.4]: https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.4
const MAX_TEXT_LEN: usize = 253;

/// The maximum length of a label in a domain name.
const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// ABSOLUTE NAMES                                                     //
////////////////////////////////////////////////////////////////////////

/// An absolute domain name, stored in lower case without the trailing
/// dot.
///
/// A `Name` is constructed through its [`FromStr`] implementation,
/// which accepts the name with or without a trailing dot. Labels must
/// consist of ASCII letters, digits, hyphens, and underscores, and may
/// not start or end with a hyphen. The root name on its own is not a
/// valid `Name`, since no zone managed here can be the root zone.
#[derive(Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Name(Box<str>);

impl Name {
    /// Returns the name as a string, without the trailing dot.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the fully-qualified form of the name, with the trailing
    /// dot.
    pub fn to_fqdn(&self) -> String {
        format!("{}.", self.0)
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.strip_suffix('.').unwrap_or(s);
        check_text(text)?;
        for label in text.split('.') {
            if label == "*" {
                return Err(Error::MisplacedWildcard);
            }
            check_label(label)?;
        }
        Ok(Self(text.to_ascii_lowercase().into()))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// OWNER NAMES                                                        //
////////////////////////////////////////////////////////////////////////

/// The owner of a record, as written in the first field of a zone file
/// record line.
///
/// This is either `@`, a name relative to the zone's origin, or an
/// absolute name ending in a dot. The first label may be the wildcard
/// label `*`. The text is kept in lower case exactly as it will be
/// written to the zone file.
#[derive(Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Owner(Box<str>);

impl Owner {
    /// Returns the owner representing the zone apex (`@`).
    pub fn apex() -> Self {
        Self("@".into())
    }

    /// Returns whether this owner is the zone apex (`@`).
    pub fn is_apex(&self) -> bool {
        &*self.0 == "@"
    }

    /// Returns the owner as it appears in a zone file.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rewrites an absolute owner that names the apex of `zone` as `@`,
    /// so that every spelling of the apex is treated alike.
    pub fn relative_to(self, zone: &Name) -> Self {
        match self.0.strip_suffix('.') {
            Some(absolute) if absolute == zone.as_str() => Self::apex(),
            _ => self,
        }
    }
}

impl FromStr for Owner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "@" {
            return Ok(Self::apex());
        }
        let text = s.strip_suffix('.').unwrap_or(s);
        check_text(text)?;
        for (i, label) in text.split('.').enumerate() {
            if label == "*" {
                if i > 0 {
                    return Err(Error::MisplacedWildcard);
                }
            } else {
                check_label(label)?;
            }
        }
        Ok(Self(s.to_ascii_lowercase().into()))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// VALIDATION HELPERS                                                 //
////////////////////////////////////////////////////////////////////////

/// Checks the properties of the whole presentation-form text (without
/// the trailing dot) that do not depend on individual labels.
fn check_text(text: &str) -> Result<(), Error> {
    if text.is_empty() {
        Err(Error::StrEmpty)
    } else if !text.is_ascii() {
        Err(Error::StrNotAscii)
    } else if text.len() > MAX_TEXT_LEN {
        Err(Error::NameTooLong)
    } else {
        Ok(())
    }
}

/// Checks a single non-wildcard label.
fn check_label(label: &str) -> Result<(), Error> {
    if label.is_empty() {
        return Err(Error::EmptyLabel);
    } else if label.len() > MAX_LABEL_LEN {
        return Err(Error::LabelTooLong);
    }
    if !label
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::InvalidCharacter);
    }
    if label.starts_with('-') || label.ends_with('-') {
        Err(Error::HyphenAtLabelEdge)
    } else {
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// SERDE SUPPORT                                                      //
////////////////////////////////////////////////////////////////////////

/// Implements [`Serialize`] and [`Deserialize`] for a name type in
/// terms of its textual form, so that deserialization validates.
macro_rules! impl_serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(de::Error::custom)
            }
        }
    };
}

impl_serde_via_str!(Name);
impl_serde_via_str!(Owner);

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

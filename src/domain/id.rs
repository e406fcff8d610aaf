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

//! Implementation of the [`RecordId`] type.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::name::Owner;
use crate::rr::Type;
use crate::util::{ascii_hex_digit_to_nibble, nibble_to_ascii_hex_digit};

/// The number of digest octets kept in a [`RecordId`].
const ID_LEN: usize = 16;

/// The stable identity of a record within a domain.
///
/// A `RecordId` is derived from a record's owner, type, and target
/// (but not its TTL) by hashing them with SHA-256 and keeping the first
/// 128 bits. Upserting the same logical record therefore always lands
/// on the same key, and changing only the TTL overwrites the existing
/// entry rather than adding a second one.
///
/// Distinct records producing the same identifier are not detected;
/// the second would silently replace the first. At 128 bits this is
/// not a practical concern for the sizes of zones managed here.
///
/// The textual form is 32 lower-case hex digits.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct RecordId([u8; ID_LEN]);

impl RecordId {
    /// Computes the identifier of the record with the given owner,
    /// type, and (normalized) target.
    pub fn of(owner: &Owner, rr_type: Type, target: &str) -> Self {
        let mut hasher = Sha256::new();
        // The NUL separators keep e.g. ("ab", "c") and ("a", "bc")
        // apart. None of the fields may contain a NUL.
        hasher.update(owner.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(rr_type.mnemonic().as_bytes());
        hasher.update([0]);
        hasher.update(target.as_bytes());
        let digest = hasher.finalize();

        let mut id = [0; ID_LEN];
        id.copy_from_slice(&digest[..ID_LEN]);
        Self(id)
    }
}

impl FromStr for RecordId {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim().as_bytes();
        if text.len() != ID_LEN * 2 {
            return Err("record ID must be 32 hex digits");
        }
        let mut id = [0; ID_LEN];
        for (octet, pair) in id.iter_mut().zip(text.chunks_exact(2)) {
            let high = ascii_hex_digit_to_nibble(pair[0]);
            let low = ascii_hex_digit_to_nibble(pair[1]);
            match (high, low) {
                (Some(high), Some(low)) => *octet = (high << 4) | low,
                _ => return Err("record ID contains a non-hex character"),
            }
        }
        Ok(Self(id))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for octet in self.0 {
            f.write_char(char::from(nibble_to_ascii_hex_digit(octet >> 4)))?;
            f.write_char(char::from(nibble_to_ascii_hex_digit(octet & 0xf)))?;
        }
        Ok(())
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RecordId({self})")
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
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

    fn owner(text: &str) -> Owner {
        text.parse().unwrap()
    }

    #[test]
    fn id_is_deterministic() {
        let a = RecordId::of(&owner("www"), Type::A, "192.0.2.1");
        let b = RecordId::of(&owner("www"), Type::A, "192.0.2.1");
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 32);
    }

    #[test]
    fn id_depends_on_every_field() {
        let base = RecordId::of(&owner("www"), Type::A, "192.0.2.1");
        assert_ne!(base, RecordId::of(&owner("web"), Type::A, "192.0.2.1"));
        assert_ne!(base, RecordId::of(&owner("www"), Type::Aaaa, "192.0.2.1"));
        assert_ne!(base, RecordId::of(&owner("www"), Type::A, "192.0.2.2"));
    }

    #[test]
    fn field_boundaries_are_not_ambiguous() {
        let a = RecordId::of(&owner("ab"), Type::Txt, "\"c\"");
        let b = RecordId::of(&owner("a"), Type::Txt, "b\"c\"");
        assert_ne!(a, b);
    }

    #[test]
    fn id_parses_from_display_form() {
        let id = RecordId::of(&owner("@"), Type::Mx, "10 mail");
        let text = id.to_string();
        assert_eq!(text.parse::<RecordId>(), Ok(id));
        assert_eq!(text.to_ascii_uppercase().parse::<RecordId>(), Ok(id));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!("".parse::<RecordId>().is_err());
        assert!("abc".parse::<RecordId>().is_err());
        assert!("zz".repeat(16).parse::<RecordId>().is_err());
    }
}

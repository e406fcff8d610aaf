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

//! Implementation of the [`Error`] type for name-related errors.

use std::fmt;

/// An error type used to report problems parsing [`Name`](super::Name)
/// and [`Owner`](super::Owner) values.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// A label was empty (e.g., `a..b` or a leading dot).
    EmptyLabel,

    /// A label started or ended with a hyphen.
    HyphenAtLabelEdge,

    /// A label contained a character other than an ASCII letter, digit,
    /// hyphen, or underscore.
    InvalidCharacter,

    /// A label was longer than 63 octets.
    LabelTooLong,

    /// A `*` label appeared somewhere other than the first label of an
    /// owner name, or in a zone name.
    MisplacedWildcard,

    /// The name is too long (longer than 255 bytes on the wire).
    NameTooLong,

    /// The string was empty, or consisted only of the root label.
    StrEmpty,

    /// The string was not strictly ASCII.
    StrNotAscii,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::EmptyLabel => f.write_str("name contains an empty label"),
            Self::HyphenAtLabelEdge => f.write_str("label starts or ends with a hyphen"),
            Self::InvalidCharacter => f.write_str("label contains an invalid character"),
            Self::LabelTooLong => f.write_str("label is longer than 63 bytes"),
            Self::MisplacedWildcard => f.write_str("wildcard label is not allowed here"),
            Self::NameTooLong => f.write_str("name is longer than 255 bytes on the wire"),
            Self::StrEmpty => f.write_str("string was empty"),
            Self::StrNotAscii => f.write_str("string was not ASCII"),
        }
    }
}

impl std::error::Error for Error {}

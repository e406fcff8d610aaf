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

//! The persistent catalog of managed domains.
//!
//! Persistence is split in two layers. The [`Store`] trait is an
//! ordered key-value store with atomic single-key reads and writes; it
//! knows nothing about DNS. The [`Catalog`] sits on top of any `Store`
//! and maps domain names to JSON-encoded [`Domain`](crate::domain::Domain)
//! values.
//!
//! Two stores are provided: [`MemoryStore`], used by tests and
//! short-lived tools, and [`DirStore`], which keeps one file per key in
//! a directory.

use std::fmt;
use std::io;

mod catalog;
mod dir;
mod memory;
pub use catalog::Catalog;
pub use dir::DirStore;
pub use memory::MemoryStore;

////////////////////////////////////////////////////////////////////////
// STORE TRAIT                                                        //
////////////////////////////////////////////////////////////////////////

/// An ordered key-value store with atomic single-key operations.
///
/// Each operation on a single key must be atomic: a concurrent `get`
/// sees either the value before or after a `put`, never a mix. No
/// multi-key transactions are required.
pub trait Store: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), Error>;

    /// Returns every key-value pair in the store, ordered by key.
    fn scan(&self) -> Result<Vec<(String, Vec<u8>)>, Error>;
}

impl<T: Store + ?Sized> Store for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        (**self).delete(key)
    }

    fn scan(&self) -> Result<Vec<(String, Vec<u8>)>, Error> {
        (**self).scan()
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors from the catalog persistence layer.
#[derive(Debug)]
pub enum Error {
    /// The key cannot be stored by this store.
    InvalidKey(String),

    /// An I/O error occurred while accessing the value for a key (or,
    /// with an empty key, while scanning).
    Io(String, io::Error),

    /// The value stored under a key could not be decoded.
    Decode(String, serde_json::Error),

    /// A value could not be encoded for storage.
    Encode(String, serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "the key {key:?} cannot be stored"),
            Self::Io(key, e) if key.is_empty() => write!(f, "I/O error scanning the store: {e}"),
            Self::Io(key, e) => write!(f, "I/O error accessing {key}: {e}"),
            Self::Decode(key, e) => write!(f, "the stored value of {key} is corrupt: {e}"),
            Self::Encode(key, e) => write!(f, "failed to encode {key}: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidKey(_) => None,
            Self::Io(_, e) => Some(e),
            Self::Decode(_, e) | Self::Encode(_, e) => Some(e),
        }
    }
}

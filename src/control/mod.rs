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

//! The control channel to the running name server.
//!
//! The name server's live zone table can only be changed through three
//! operations: adding a zone, deleting a zone, and reloading a zone
//! from its zone file. The [`ControlChannel`] trait captures exactly
//! these, so the engine does not depend on how they are carried out.
//! [`Rndc`] implements them by running BIND's `rndc` utility.

use std::fmt;
use std::path::Path;

use log::warn;

use crate::name::Name;

mod rndc;
pub use rndc::Rndc;

////////////////////////////////////////////////////////////////////////
// CONTROL CHANNEL TRAIT                                              //
////////////////////////////////////////////////////////////////////////

/// Trait for the administrative interface of a name server.
///
/// Every operation either takes full effect or none; a failure never
/// leaves a half-registered zone behind as far as the caller can tell.
/// Implementations should report "already there" and "not there" with
/// [`ErrorKind::AlreadyExists`] and [`ErrorKind::NotFound`] so that
/// callers can treat repeated requests as idempotent, and should mark
/// failures that are worth retrying (e.g., the server is busy or
/// temporarily unreachable) as [`ErrorKind::Transient`].
pub trait ControlChannel: Send + Sync {
    /// Registers the zone `name`, to be loaded from the zone file at
    /// `path`. The zone is not necessarily served until it is reloaded.
    fn add_zone(&self, name: &Name, path: &Path) -> Result<(), Error>;

    /// Deregisters the zone `name`.
    fn delete_zone(&self, name: &Name) -> Result<(), Error>;

    /// Makes the name server re-read the zone file of `name`.
    fn reload_zone(&self, name: &Name) -> Result<(), Error>;
}

impl<T: ControlChannel + ?Sized> ControlChannel for &T {
    fn add_zone(&self, name: &Name, path: &Path) -> Result<(), Error> {
        (**self).add_zone(name, path)
    }

    fn delete_zone(&self, name: &Name) -> Result<(), Error> {
        (**self).delete_zone(name)
    }

    fn reload_zone(&self, name: &Name) -> Result<(), Error> {
        (**self).reload_zone(name)
    }
}

/// Runs a control channel operation, retrying it once if the first
/// attempt fails with a transient error. Any other failure, or a second
/// failure, is returned as-is.
pub fn with_retry<F>(mut call: F) -> Result<(), Error>
where
    F: FnMut() -> Result<(), Error>,
{
    match call() {
        Err(e) if e.is_transient() => {
            warn!("{}; retrying once.", e);
            call()
        }
        result => result,
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// The control channel operations.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    AddZone,
    DeleteZone,
    ReloadZone,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AddZone => f.write_str("add zone"),
            Self::DeleteZone => f.write_str("delete zone"),
            Self::ReloadZone => f.write_str("reload zone"),
        }
    }
}

/// A failed control channel operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    operation: Operation,
    zone: Name,
    kind: ErrorKind,
}

/// Kinds of control channel failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The zone to be added is already registered.
    AlreadyExists,

    /// The zone to be deleted or reloaded is not registered.
    NotFound,

    /// The name server could not handle the request right now. The
    /// string holds its diagnostic output.
    Transient(String),

    /// The request failed for any other reason. The string holds the
    /// diagnostic output.
    Failed(String),
}

impl Error {
    pub fn new(operation: Operation, zone: Name, kind: ErrorKind) -> Self {
        Self {
            operation,
            zone,
            kind,
        }
    }

    /// Returns the operation that failed.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the zone the operation was for.
    pub fn zone(&self) -> &Name {
        &self.zone
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns whether the failure is worth a single retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to {} {}: ", self.operation, self.zone)?;
        match self.kind {
            ErrorKind::AlreadyExists => f.write_str("the zone already exists"),
            ErrorKind::NotFound => f.write_str("the zone does not exist"),
            ErrorKind::Transient(ref detail) => {
                write!(f, "the name server is temporarily unavailable ({detail})")
            }
            ErrorKind::Failed(ref detail) if detail.is_empty() => {
                f.write_str("the name server reported no details")
            }
            ErrorKind::Failed(ref detail) => f.write_str(detail),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

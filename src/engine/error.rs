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

//! Error types for the synchronization engine.

use std::fmt;
use std::io;

use crate::control;
use crate::domain::ValidationError;
use crate::store;

////////////////////////////////////////////////////////////////////////
// ERROR STRUCTURE                                                    //
////////////////////////////////////////////////////////////////////////

/// An error returned by an [`Engine`](super::Engine) operation.
///
/// Besides the [`ErrorKind`], an `Error` records the domain the
/// operation was for and the [`Step`] that failed. Failures that happen
/// after an earlier step already changed something (the zone file, the
/// name server, or the catalog) carry a note describing the state left
/// behind, so that an operator can reconcile it.
#[derive(Debug)]
pub struct Error {
    pub(super) domain: String,
    pub(super) step: Step,
    pub(super) kind: ErrorKind,
    pub(super) note: Option<String>,
}

impl Error {
    pub(super) fn new(domain: impl Into<String>, step: Step, kind: ErrorKind) -> Self {
        Self {
            domain: domain.into(),
            step,
            kind,
            note: None,
        }
    }

    pub(super) fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Returns the domain the failed operation was for. This is empty
    /// for operations on the whole catalog.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the step at which the operation failed.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the description of any inconsistent state left behind.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.domain.is_empty() {
            write!(f, "failed to {}: {}", self.step, self.kind)?;
        } else {
            write!(
                f,
                "failed to {} for {}: {}",
                self.step, self.domain, self.kind
            )?;
        }
        if let Some(ref note) = self.note {
            write!(f, " ({note})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::NotFound | ErrorKind::AlreadyExists => None,
            ErrorKind::Validation(ref e) => Some(e),
            ErrorKind::ArtifactWrite(ref e) => Some(e),
            ErrorKind::ControlChannel(ref e) => Some(e),
            ErrorKind::Store(ref e) => Some(e),
        }
    }
}

/// A result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// ERROR KINDS                                                        //
////////////////////////////////////////////////////////////////////////

/// Kinds of errors that engine operations report.
#[derive(Debug)]
pub enum ErrorKind {
    /// The domain is not in the catalog.
    NotFound,

    /// The domain to be created is already in the catalog.
    AlreadyExists,

    /// The input was malformed.
    Validation(ValidationError),

    /// The zone file could not be written (or the zone file directory
    /// could not be read).
    ArtifactWrite(io::Error),

    /// The name server rejected a control channel request or could not
    /// be reached.
    ControlChannel(control::Error),

    /// The catalog could not be read or written.
    Store(store::Error),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("the domain does not exist"),
            Self::AlreadyExists => f.write_str("the domain already exists"),
            Self::Validation(e) => e.fmt(f),
            Self::ArtifactWrite(e) => write!(f, "zone file I/O error: {e}"),
            Self::ControlChannel(e) => e.fmt(f),
            Self::Store(e) => e.fmt(f),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// STEPS                                                              //
////////////////////////////////////////////////////////////////////////

/// The steps of the engine's mutation protocols.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Step {
    Validate,
    LoadCatalog,
    WriteZoneFile,
    AddZone,
    ReloadZone,
    DeleteZone,
    CommitCatalog,
    RemoveFromCatalog,
    ScanCatalog,
    ScanZoneFiles,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate the request",
            Self::LoadCatalog => "read the catalog",
            Self::WriteZoneFile => "write the zone file",
            Self::AddZone => "add the zone to the name server",
            Self::ReloadZone => "reload the zone",
            Self::DeleteZone => "delete the zone from the name server",
            Self::CommitCatalog => "commit to the catalog",
            Self::RemoveFromCatalog => "remove from the catalog",
            Self::ScanCatalog => "scan the catalog",
            Self::ScanZoneFiles => "scan the zone file directory",
        })
    }
}

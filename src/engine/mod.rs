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

//! The synchronization engine.
//!
//! An [`Engine`] keeps three things in step: the [`Catalog`] (the
//! durable record of every managed domain), the zone files on disk, and
//! the name server's live zone table. It has no way of changing all
//! three atomically, so every mutation follows a fixed order of steps
//! chosen so that the catalog is always written last:
//!
//! * creating a domain writes its zone file, adds the zone to the name
//!   server, reloads it, and only then commits the domain;
//! * changing a record writes the new zone file, reloads the zone, and
//!   then commits;
//! * deleting a domain removes it from the catalog first and then
//!   deletes the zone from the name server. The zone file is left on
//!   disk (see [`Engine::orphaned_artifacts`]).
//!
//! The operation stops at the first failing step, and nothing already
//! done is rolled back. Since the catalog is written last, a failure
//! never makes the catalog claim a state that the name server was not
//! given; at worst, the zone file or the name server is ahead of the
//! catalog until the next successful change to the domain rewrites
//! them. The [`Error`] of such a failure carries a note describing what
//! was left behind.
//!
//! Operations on the same domain are serialized; operations on
//! different domains run in parallel.

use std::path::PathBuf;

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::control::{self, with_retry, ControlChannel};
use crate::domain::{describe, Domain, RecordFields, RecordId, ValidationError};
use crate::name::Name;
use crate::store::{Catalog, Store};
use crate::zone_file::ZoneFiles;

mod error;
mod locks;
pub use error::{Error, ErrorKind, Result, Step};
use locks::LockTable;

////////////////////////////////////////////////////////////////////////
// ENGINE STRUCTURE                                                   //
////////////////////////////////////////////////////////////////////////

/// Coordinates the catalog, the zone files, and the name server.
#[derive(Debug)]
pub struct Engine<S, C> {
    catalog: Catalog<S>,
    zone_files: ZoneFiles,
    control: C,
    locks: LockTable,
}

impl<S: Store, C: ControlChannel> Engine<S, C> {
    pub fn new(catalog: Catalog<S>, zone_files: ZoneFiles, control: C) -> Self {
        Self {
            catalog,
            zone_files,
            control,
            locks: LockTable::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn zone_files(&self) -> &ZoneFiles {
        &self.zone_files
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    ////////////////////////////////////////////////////////////////////
    // DOMAIN OPERATIONS                                              //
    ////////////////////////////////////////////////////////////////////

    /// Creates the domain `name` with no records and serial zero.
    ///
    /// If the name server already has the zone registered (e.g.,
    /// because an earlier attempt failed after adding it), the zone is
    /// adopted rather than treated as an error, so repeating a failed
    /// creation completes it.
    pub fn create_domain(&self, name: &str) -> Result<Domain> {
        let name = parse_domain_name(name)?;
        self.locks.with(&name, || {
            if self.catalog.contains(&name).map_err(store_error(&name, Step::LoadCatalog))? {
                debug!("Refusing to create {}: it already exists.", name);
                return Err(Error::new(name.as_str(), Step::LoadCatalog, ErrorKind::AlreadyExists));
            }

            let domain = Domain::new(name.clone(), Utc::now());
            debug!("Creating {}: writing its zone file.", name);
            let path = self.zone_files.write(&domain).map_err(|e| {
                abort(Error::new(name.as_str(), Step::WriteZoneFile, ErrorKind::ArtifactWrite(e)))
            })?;

            debug!("Creating {}: adding the zone to the name server.", name);
            match with_retry(|| self.control.add_zone(&name, &path)) {
                Ok(()) => (),
                Err(e) if *e.kind() == control::ErrorKind::AlreadyExists => {
                    warn!("The name server already had {} registered; adopting it.", name);
                }
                Err(e) => {
                    return Err(abort(
                        Error::new(name.as_str(), Step::AddZone, ErrorKind::ControlChannel(e))
                            .with_note(format!(
                                "the zone file {} was left on disk",
                                path.display()
                            )),
                    ));
                }
            }

            debug!("Creating {}: reloading the zone.", name);
            with_retry(|| self.control.reload_zone(&name)).map_err(|e| {
                abort(
                    Error::new(name.as_str(), Step::ReloadZone, ErrorKind::ControlChannel(e))
                        .with_note(
                            "the zone is registered with the name server but may not be \
                             served; repeat the creation to complete it",
                        ),
                )
            })?;

            debug!("Creating {}: committing to the catalog.", name);
            self.catalog.commit(&domain).map_err(|e| {
                abort(
                    store_error(&name, Step::CommitCatalog)(e).with_note(
                        "the name server serves the zone but the catalog has no record of \
                         it; repeat the creation to complete it",
                    ),
                )
            })?;

            info!("Created domain {}.", name);
            Ok(domain)
        })
    }

    /// Deletes the domain `name`, returning its final state.
    ///
    /// The domain is removed from the catalog before the zone is
    /// deleted from the name server. A name server that no longer knows
    /// the zone is not an error. The zone file is kept.
    pub fn delete_domain(&self, name: &str) -> Result<Domain> {
        let name = parse_domain_name(name)?;
        self.locks.with(&name, || {
            let domain = self.load_existing(&name)?;

            debug!("Deleting {}: removing it from the catalog.", name);
            self.catalog
                .remove(&name)
                .map_err(|e| abort(store_error(&name, Step::RemoveFromCatalog)(e)))?;

            debug!("Deleting {}: deleting the zone from the name server.", name);
            match with_retry(|| self.control.delete_zone(&name)) {
                Ok(()) => (),
                Err(e) if *e.kind() == control::ErrorKind::NotFound => {
                    warn!("The name server did not have {} registered.", name);
                }
                Err(e) => {
                    return Err(abort(
                        Error::new(name.as_str(), Step::DeleteZone, ErrorKind::ControlChannel(e))
                            .with_note(
                                "the domain was removed from the catalog, but the name \
                                 server may still serve it",
                            ),
                    ));
                }
            }

            info!(
                "Deleted domain {}; its zone file {} was left in place.",
                name,
                self.zone_files.path_for(&name).display(),
            );
            Ok(domain)
        })
    }

    /// Returns the current state of the domain `name`.
    pub fn domain(&self, name: &str) -> Result<Domain> {
        let name = parse_domain_name(name)?;
        self.load_existing(&name)
    }

    /// Returns every domain in the catalog, ordered by name.
    pub fn domains(&self) -> Result<Vec<Domain>> {
        self.catalog
            .domains()
            .map_err(|e| Error::new("", Step::ScanCatalog, ErrorKind::Store(e)))
    }

    /// Rewrites the zone file of `name` from the catalog and reloads
    /// the zone, without changing the serial or the catalog. This
    /// repairs a zone file or name server left ahead of the catalog by
    /// an earlier failure.
    pub fn resync_domain(&self, name: &str) -> Result<Domain> {
        let name = parse_domain_name(name)?;
        self.locks.with(&name, || {
            let domain = self.load_existing(&name)?;
            debug!("Resynchronizing {} at serial {}.", name, domain.serial());
            self.publish(
                &domain,
                "the zone file matches the catalog, but the name server has not loaded it",
            )?;
            info!("Resynchronized domain {} at serial {}.", name, domain.serial());
            Ok(domain)
        })
    }

    /// Returns the paths of zone files that have no domain in the
    /// catalog, such as those left behind by deleted domains or failed
    /// creations. Nothing is removed.
    pub fn orphaned_artifacts(&self) -> Result<Vec<PathBuf>> {
        let on_disk = self
            .zone_files
            .list()
            .map_err(|e| Error::new("", Step::ScanZoneFiles, ErrorKind::ArtifactWrite(e)))?;
        let mut orphans = Vec::new();
        for name in on_disk {
            if !self.catalog.contains(&name).map_err(store_error(&name, Step::LoadCatalog))? {
                orphans.push(self.zone_files.path_for(&name));
            }
        }
        Ok(orphans)
    }

    ////////////////////////////////////////////////////////////////////
    // RECORD OPERATIONS                                              //
    ////////////////////////////////////////////////////////////////////

    /// Adds the record described by `fields` to the domain `domain`,
    /// or replaces the record with the same identity (owner, type, and
    /// target, so in practice only the TTL changes). Either way the
    /// serial advances by one. Returns the domain's new state.
    pub fn upsert_record(&self, domain: &str, fields: &RecordFields) -> Result<Domain> {
        let name = parse_domain_name(domain)?;
        let record = fields
            .validate(&name)
            .map_err(|e| reject(&name, Step::Validate, ErrorKind::Validation(e)))?;

        self.locks.with(&name, || {
            let mut domain = self.load_existing(&name)?;
            let description = describe(&record);
            let replaced = domain.upsert(record).is_some();
            debug!(
                "Updating {} to serial {}: {} {}.",
                name,
                domain.serial(),
                if replaced { "replacing" } else { "adding" },
                description,
            );
            self.apply(&domain)?;
            info!(
                "{} record {} in {}; serial is now {}.",
                if replaced { "Replaced" } else { "Added" },
                description,
                name,
                domain.serial(),
            );
            Ok(domain)
        })
    }

    /// Deletes the record `id` from the domain `domain`. Deleting a
    /// record that does not exist is not an error: the records stay as
    /// they are, but the serial still advances and the zone is
    /// republished like any other change. Returns the domain's new
    /// state.
    pub fn delete_record(&self, domain: &str, id: &str) -> Result<Domain> {
        let name = parse_domain_name(domain)?;
        let id: RecordId = id.parse().map_err(|e| {
            reject(&name, Step::Validate, ErrorKind::Validation(ValidationError::RecordId(e)))
        })?;

        self.locks.with(&name, || {
            let mut domain = self.load_existing(&name)?;
            let description = match domain.remove(id) {
                Some(removed) => describe(&removed),
                None => {
                    debug!("Record {} is not in {}; republishing anyway.", id, name);
                    id.to_string()
                }
            };
            debug!(
                "Updating {} to serial {}: deleting {}.",
                name,
                domain.serial(),
                description,
            );
            self.apply(&domain)?;
            info!(
                "Deleted {} from {}; serial is now {}.",
                description,
                name,
                domain.serial(),
            );
            Ok(domain)
        })
    }

    ////////////////////////////////////////////////////////////////////
    // HELPERS                                                        //
    ////////////////////////////////////////////////////////////////////

    /// Loads the domain `name`, failing with [`ErrorKind::NotFound`] if
    /// it is not in the catalog.
    fn load_existing(&self, name: &Name) -> Result<Domain> {
        match self.catalog.load(name) {
            Ok(Some(domain)) => Ok(domain),
            Ok(None) => Err(reject(name, Step::LoadCatalog, ErrorKind::NotFound)),
            Err(e) => Err(abort(store_error(name, Step::LoadCatalog)(e))),
        }
    }

    /// Publishes a changed `domain` to the zone file and name server,
    /// then commits it to the catalog.
    fn apply(&self, domain: &Domain) -> Result<()> {
        let name = domain.name();
        self.publish(
            domain,
            "the zone file is ahead of the catalog; the next successful change to the \
             domain will rewrite it",
        )?;
        debug!("Committing {} at serial {}.", name, domain.serial());
        self.catalog.commit(domain).map_err(|e| {
            abort(
                store_error(name, Step::CommitCatalog)(e).with_note(
                    "the name server serves a change the catalog does not record; the next \
                     successful change to the domain will replace it",
                ),
            )
        })
    }

    /// Writes the zone file of `domain` and reloads the zone. The
    /// `reload_note` describes the state left behind if the reload
    /// fails.
    fn publish(&self, domain: &Domain, reload_note: &str) -> Result<()> {
        let name = domain.name();
        self.zone_files.write(domain).map_err(|e| {
            abort(Error::new(name.as_str(), Step::WriteZoneFile, ErrorKind::ArtifactWrite(e)))
        })?;
        debug!("Reloading {}.", name);
        with_retry(|| self.control.reload_zone(name)).map_err(|e| {
            abort(
                Error::new(name.as_str(), Step::ReloadZone, ErrorKind::ControlChannel(e))
                    .with_note(reload_note),
            )
        })
    }
}

/// Parses a user-supplied domain name.
fn parse_domain_name(text: &str) -> Result<Name> {
    text.parse().map_err(|e| {
        let error = Error::new(
            text,
            Step::Validate,
            ErrorKind::Validation(ValidationError::DomainName(e)),
        );
        debug!("{}", error);
        error
    })
}

/// Returns a closure mapping a store error at `step` to an engine
/// error for the domain `name`.
fn store_error(name: &Name, step: Step) -> impl FnOnce(crate::store::Error) -> Error + '_ {
    move |e| Error::new(name.as_str(), step, ErrorKind::Store(e))
}

/// Logs and returns an error that rejects a request before anything
/// was changed.
fn reject(name: &Name, step: Step, kind: ErrorKind) -> Error {
    let error = Error::new(name.as_str(), step, kind);
    debug!("{}", error);
    error
}

/// Logs and returns an error that stops an operation partway.
fn abort(error: Error) -> Error {
    if error.note().is_some() {
        warn!("Inconsistency window opened for {}.", error.domain());
    }
    error!("{}", error);
    error
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

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

//! The managed data model: [`Domain`]s and their [`Record`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::name::{Name, Owner};
use crate::rr::{Ttl, Type};

mod id;
mod validate;
pub use id::RecordId;
pub(crate) use validate::describe;
pub use validate::{RecordFields, ValidationError};

////////////////////////////////////////////////////////////////////////
// RECORDS                                                            //
////////////////////////////////////////////////////////////////////////

/// A validated resource record belonging to a [`Domain`].
///
/// `Record`s are only built through [`RecordFields::validate`], so the
/// owner, type, and target are always in the form written to the zone
/// file, and the [`RecordId`] always matches them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    #[serde(rename = "name")]
    owner: Owner,
    #[serde(rename = "type")]
    rr_type: Type,
    ttl: Ttl,
    target: String,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn rr_type(&self) -> Type {
        self.rr_type
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

////////////////////////////////////////////////////////////////////////
// DOMAINS                                                            //
////////////////////////////////////////////////////////////////////////

/// A managed zone: its name, SOA serial, records, and creation time.
///
/// The serial starts at zero and moves forward by exactly one with
/// every mutation of the record set ([`Domain::upsert`] and
/// [`Domain::remove`], even when the record to remove is absent).
/// Nothing else changes it. Increments wrap
/// according to the serial number arithmetic of [RFC 1982], which is
/// how secondaries compare serials.
///
/// Records are kept in a [`BTreeMap`] keyed by [`RecordId`] so that
/// the serialized form of a `Domain` is deterministic.
///
/// [RFC 1982]: https://datatracker.ietf.org/doc/html/rfc1982
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredDomain")]
pub struct Domain {
    name: Name,
    serial: u32,
    records: BTreeMap<RecordId, Record>,
    created: DateTime<Utc>,
}

impl Domain {
    /// Creates a new, empty `Domain` with serial zero.
    pub fn new(name: Name, created: DateTime<Utc>) -> Self {
        Self {
            name,
            serial: 0,
            records: BTreeMap::new(),
            created,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns the records of the domain, ordered by [`RecordId`].
    pub fn records(&self) -> impl ExactSizeIterator<Item = &Record> {
        self.records.values()
    }

    /// Looks up a record by its identifier.
    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Inserts `record`, replacing the record with the same identifier
    /// if there is one, and advances the serial. The replaced record is
    /// returned.
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        let previous = self.records.insert(record.id, record);
        self.advance_serial();
        previous
    }

    /// Removes the record identified by `id`, if present, and advances
    /// the serial. The removed record is returned.
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let removed = self.records.remove(&id);
        self.advance_serial();
        removed
    }

    fn advance_serial(&mut self) {
        self.serial = self.serial.wrapping_add(1);
    }
}

/// The shape of a [`Domain`] as found in the catalog, before checking
/// that every record is filed under its own identifier.
#[derive(Deserialize)]
struct StoredDomain {
    name: Name,
    serial: u32,
    records: BTreeMap<RecordId, Record>,
    created: DateTime<Utc>,
}

impl TryFrom<StoredDomain> for Domain {
    type Error = String;

    fn try_from(stored: StoredDomain) -> Result<Self, Self::Error> {
        for (key, record) in &stored.records {
            if *key != record.id {
                return Err(format!("record filed under {key} has ID {}", record.id));
            }
            let expected = RecordId::of(&record.owner, record.rr_type, &record.target);
            if record.id != expected {
                return Err(format!("record {key} does not match its contents"));
            }
        }
        Ok(Self {
            name: stored.name,
            serial: stored.serial,
            records: stored.records,
            created: stored.created,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str, rr_type: &str, ttl: &str, target: &str) -> Record {
        RecordFields {
            name: name.into(),
            rr_type: rr_type.into(),
            ttl: ttl.into(),
            target: target.into(),
        }
        .validate(&"example.com".parse().unwrap())
        .unwrap()
    }

    fn domain() -> Domain {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Domain::new("example.com".parse().unwrap(), created)
    }

    #[test]
    fn new_domain_is_empty_with_serial_zero() {
        let domain = domain();
        assert_eq!(domain.serial(), 0);
        assert_eq!(domain.records().len(), 0);
    }

    #[test]
    fn upsert_of_same_record_overwrites_ttl() {
        let mut domain = domain();
        assert!(domain.upsert(record("www", "A", "300", "192.0.2.1")).is_none());
        let previous = domain.upsert(record("www", "A", "900", "192.0.2.1"));
        assert_eq!(previous.map(|r| u32::from(r.ttl())), Some(300));
        assert_eq!(domain.records().len(), 1);
        assert_eq!(u32::from(domain.records().next().unwrap().ttl()), 900);
        assert_eq!(domain.serial(), 2);
    }

    #[test]
    fn removing_an_absent_record_keeps_records_but_advances_serial() {
        let mut domain = domain();
        domain.upsert(record("www", "A", "", "192.0.2.1"));
        let before = domain.clone();
        let absent = record("mail", "A", "", "192.0.2.2").id();
        assert!(domain.remove(absent).is_none());
        assert_eq!(domain.serial(), before.serial() + 1);
        assert!(domain.records().eq(before.records()));
    }

    #[test]
    fn removing_a_present_record_advances_serial() {
        let mut domain = domain();
        let www = record("www", "A", "", "192.0.2.1");
        domain.upsert(www.clone());
        assert_eq!(domain.remove(www.id()), Some(www));
        assert_eq!(domain.serial(), 2);
        assert_eq!(domain.records().len(), 0);
    }

    #[test]
    fn serial_wraps_per_rfc1982() {
        let mut domain = domain();
        domain.serial = u32::MAX;
        domain.upsert(record("www", "A", "", "192.0.2.1"));
        assert_eq!(domain.serial(), 0);
    }

    #[test]
    fn json_encoding_preserves_every_field() {
        let mut domain = domain();
        domain.upsert(record("www", "A", "300", "192.0.2.1"));
        domain.upsert(record("@", "MX", "", "10 mail"));
        domain.upsert(record("@", "TXT", "", "v=spf1 -all"));

        let encoded = serde_json::to_vec(&domain).unwrap();
        let decoded: Domain = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, domain);
        assert_eq!(serde_json::to_vec(&decoded).unwrap(), encoded);
    }

    #[test]
    fn decoding_rejects_misfiled_records() {
        let mut domain = domain();
        let www = record("www", "A", "", "192.0.2.1");
        let other = record("mail", "A", "", "192.0.2.2");
        domain.upsert(www.clone());

        // The map key is the first occurrence of the ID in the encoding.
        let text = serde_json::to_string(&domain).unwrap().replacen(
            &www.id().to_string(),
            &other.id().to_string(),
            1,
        );
        assert!(serde_json::from_str::<Domain>(&text).is_err());
    }
}

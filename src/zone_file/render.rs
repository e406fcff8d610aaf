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

//! Rendering of a [`Domain`] into zone file text.

use std::fmt::Write;

use crate::domain::{Domain, Record};
use crate::name::Name;
use crate::rr::Ttl;

/// The SOA timers written into every zone: refresh, retry, expire, and
/// negative-caching TTL, in the BIND duration syntax.
const SOA_TIMERS: &str = "2H 30M 2W 1D";

/// Options that affect the generated SOA record.
#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    /// The mailbox of the person responsible for the zone, in domain
    /// name form. When unset, `hostmaster.<zone>` is used.
    pub hostmaster: Option<Name>,
}

/// Renders `domain` as zone file text.
///
/// The output is a pure function of the domain's name, serial, and
/// records (plus `options`): the creation time is not included, and
/// records are written sorted by owner, type, and target. Rendering
/// the same domain twice therefore yields byte-identical text, which
/// is what allows any mutation to regenerate the whole file from the
/// catalog.
///
/// The layout is:
///
/// ```text
/// $TTL 600
/// $ORIGIN example.com.
/// @	IN	SOA	example.com.	hostmaster.example.com.	( 3 2H 30M 2W 1D )
/// @	IN	NS	example.com.
/// www	600	IN	A	192.0.2.1
/// ```
pub fn render(domain: &Domain, options: &RenderOptions) -> String {
    let origin = domain.name().to_fqdn();
    let hostmaster = match options.hostmaster {
        Some(ref mailbox) => mailbox.to_fqdn(),
        None => format!("hostmaster.{origin}"),
    };

    let mut text = String::new();
    writeln!(text, "$TTL {}", Ttl::DEFAULT).unwrap();
    writeln!(text, "$ORIGIN {origin}").unwrap();
    writeln!(
        text,
        "@\tIN\tSOA\t{origin}\t{hostmaster}\t( {} {SOA_TIMERS} )",
        domain.serial(),
    )
    .unwrap();
    writeln!(text, "@\tIN\tNS\t{origin}").unwrap();

    let mut records: Vec<&Record> = domain.records().collect();
    records.sort_by(|a, b| {
        (a.owner(), a.rr_type(), a.target()).cmp(&(b.owner(), b.rr_type(), b.target()))
    });
    for record in records {
        writeln!(
            text,
            "{}\t{}\tIN\t{}\t{}",
            record.owner(),
            record.ttl(),
            record.rr_type(),
            record.target(),
        )
        .unwrap();
    }
    text
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

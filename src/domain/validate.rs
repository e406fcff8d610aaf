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

//! Turns loosely typed record input into well-typed [`Record`]s.
//!
//! Record fields arrive as free-form strings (from a web form or the
//! command line). They are validated exactly once, here, and every
//! other part of the crate only ever sees a [`Record`] that can be
//! written into a zone file as-is.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{Record, RecordId};
use crate::name::{self, Name, Owner};
use crate::rr::{TtlError, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// RECORD INPUT                                                       //
////////////////////////////////////////////////////////////////////////

/// The raw fields of a record as supplied by a user.
///
/// `ttl` may be empty or non-numeric, in which case the default TTL is
/// used (see [`Ttl::from_input`]).
#[derive(Clone, Debug, Default)]
pub struct RecordFields {
    pub name: String,
    pub rr_type: String,
    pub ttl: String,
    pub target: String,
}

impl RecordFields {
    /// Validates the fields for a record in the zone `zone` and builds
    /// the corresponding [`Record`].
    pub fn validate(&self, zone: &Name) -> Result<Record, ValidationError> {
        let owner = self
            .name
            .trim()
            .parse::<Owner>()
            .map_err(ValidationError::Owner)?
            .relative_to(zone);
        let rr_type: Type = self.rr_type.parse().map_err(ValidationError::Type)?;
        let ttl = Ttl::from_input(&self.ttl).map_err(ValidationError::Ttl)?;
        if rr_type == Type::Cname && owner.is_apex() {
            return Err(ValidationError::Target(
                "a CNAME record cannot be placed at the zone apex",
            ));
        }
        let target = normalize_target(rr_type, &self.target)?;
        Ok(Record {
            id: RecordId::of(&owner, rr_type, &target),
            owner,
            rr_type,
            ttl,
            target,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// VALIDATION ERRORS                                                  //
////////////////////////////////////////////////////////////////////////

/// Problems found while validating user input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationError {
    /// The domain (zone) name is malformed.
    DomainName(name::Error),

    /// The record owner name is malformed.
    Owner(name::Error),

    /// The record type is unknown or not manageable.
    Type(&'static str),

    /// The TTL is out of range.
    Ttl(TtlError),

    /// The record target does not fit the record type.
    Target(&'static str),

    /// A record ID given by the user is malformed.
    RecordId(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DomainName(e) => write!(f, "invalid domain name: {e}"),
            Self::Owner(e) => write!(f, "invalid record name: {e}"),
            Self::Type(e) => write!(f, "invalid record type: {e}"),
            Self::Ttl(e) => write!(f, "invalid TTL: {e}"),
            Self::Target(e) => write!(f, "invalid record target: {e}"),
            Self::RecordId(e) => write!(f, "invalid record ID: {e}"),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DomainName(e) | Self::Owner(e) => Some(e),
            Self::Ttl(e) => Some(e),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TARGET NORMALIZATION                                               //
////////////////////////////////////////////////////////////////////////

type TargetResult = Result<String, ValidationError>;

fn target_error(message: &'static str) -> ValidationError {
    ValidationError::Target(message)
}

/// Checks `raw` against the syntax required by `rr_type` and returns
/// the canonical text to store and render. Normalizing here means two
/// spellings of the same target (e.g. `2001:DB8::1` and `2001:db8::1`)
/// receive the same [`RecordId`].
fn normalize_target(rr_type: Type, raw: &str) -> TargetResult {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(target_error("the target is required"));
    }
    if raw.chars().any(char::is_control) {
        return Err(target_error("the target contains control characters"));
    }

    match rr_type {
        Type::A => raw
            .parse::<Ipv4Addr>()
            .map(|addr| addr.to_string())
            .or(Err(target_error("not an IPv4 address"))),
        Type::Aaaa => raw
            .parse::<Ipv6Addr>()
            .map(|addr| addr.to_string())
            .or(Err(target_error("not an IPv6 address"))),
        Type::Cname | Type::Ns | Type::Ptr => host(raw),
        Type::Mx => {
            let fields = split_fields(raw, 2, "expected <preference> <exchange>")?;
            let preference = number::<u16>(fields[0], "MX preference is not a 16-bit integer")?;
            Ok(format!("{} {}", preference, host(fields[1])?))
        }
        Type::Srv => {
            let fields = split_fields(raw, 4, "expected <priority> <weight> <port> <target>")?;
            let priority = number::<u16>(fields[0], "SRV priority is not a 16-bit integer")?;
            let weight = number::<u16>(fields[1], "SRV weight is not a 16-bit integer")?;
            let port = number::<u16>(fields[2], "SRV port is not a 16-bit integer")?;
            Ok(format!("{} {} {} {}", priority, weight, port, host(fields[3])?))
        }
        Type::Txt => quoted(raw),
        Type::Caa => {
            let mut fields = raw.splitn(3, char::is_whitespace);
            let (flags, tag, value) = match (fields.next(), fields.next(), fields.next()) {
                (Some(flags), Some(tag), Some(value)) => (flags, tag, value.trim()),
                _ => return Err(target_error("expected <flags> <tag> <value>")),
            };
            let flags = number::<u8>(flags, "CAA flags are not an 8-bit integer")?;
            if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(target_error("CAA tag must be alphanumeric"));
            }
            Ok(format!("{} {} {}", flags, tag.to_ascii_lowercase(), quoted(value)?))
        }
    }
}

/// Validates a host name target. The same forms as a record owner are
/// accepted except for wildcards.
fn host(raw: &str) -> TargetResult {
    if raw.starts_with('*') {
        return Err(target_error("the target cannot be a wildcard name"));
    }
    raw.parse::<Owner>()
        .map(|owner| owner.as_str().to_owned())
        .or(Err(target_error("the target is not a valid host name")))
}

/// Splits `raw` into exactly `n` whitespace-separated fields.
fn split_fields<'a>(
    raw: &'a str,
    n: usize,
    message: &'static str,
) -> Result<Vec<&'a str>, ValidationError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() == n {
        Ok(fields)
    } else {
        Err(target_error(message))
    }
}

fn number<T: std::str::FromStr>(raw: &str, message: &'static str) -> Result<T, ValidationError> {
    raw.parse().or(Err(target_error(message)))
}

/// Produces a zone file character string. Input that is already a
/// single quoted string is kept; anything else is quoted, escaping
/// quotes and backslashes.
fn quoted(raw: &str) -> TargetResult {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let inner = &raw[1..raw.len() - 1];
        if is_properly_escaped(inner) {
            return Ok(raw.to_owned());
        }
        return Err(target_error("the quoted string has an unescaped quote"));
    }
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Ok(out)
}

/// Checks that every `"` in `inner` is escaped and that `inner` does
/// not end in an unpaired backslash.
fn is_properly_escaped(inner: &str) -> bool {
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return false;
        }
    }
    !escaped
}

/// Writes a short human-readable description of a record, used in log
/// messages.
pub(crate) fn describe(record: &Record) -> String {
    format!(
        "{} {} {} ({})",
        record.owner, record.rr_type, record.target, record.id
    )
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Name {
        "example.com".parse().unwrap()
    }

    fn fields(name: &str, rr_type: &str, ttl: &str, target: &str) -> RecordFields {
        RecordFields {
            name: name.into(),
            rr_type: rr_type.into(),
            ttl: ttl.into(),
            target: target.into(),
        }
    }

    #[test]
    fn valid_a_record_is_built() {
        let record = fields("WWW", "a", "300", " 192.0.2.10 ").validate(&zone()).unwrap();
        assert_eq!(record.owner().as_str(), "www");
        assert_eq!(record.rr_type(), Type::A);
        assert_eq!(u32::from(record.ttl()), 300);
        assert_eq!(record.target(), "192.0.2.10");
        assert_eq!(
            record.id(),
            RecordId::of(&"www".parse().unwrap(), Type::A, "192.0.2.10"),
        );
    }

    #[test]
    fn empty_ttl_defaults_to_600() {
        let record = fields("@", "NS", "", "ns1.example.net.").validate(&zone()).unwrap();
        assert_eq!(record.ttl(), Ttl::DEFAULT);
    }

    #[test]
    fn equivalent_targets_get_the_same_id() {
        let a = fields("v6", "AAAA", "", "2001:DB8:0::1").validate(&zone()).unwrap();
        let b = fields("v6", "AAAA", "60", "2001:db8::1").validate(&zone()).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.target(), "2001:db8::1");
    }

    #[test]
    fn structured_targets_are_normalized() {
        let mx = fields("@", "MX", "", "10   mail").validate(&zone()).unwrap();
        assert_eq!(mx.target(), "10 mail");
        let srv = fields("_sip._tcp", "SRV", "", "0 5 5060 sip.example.com.")
            .validate(&zone())
            .unwrap();
        assert_eq!(srv.target(), "0 5 5060 sip.example.com.");
        let caa = fields("@", "CAA", "", "0 ISSUE letsencrypt.org")
            .validate(&zone())
            .unwrap();
        assert_eq!(caa.target(), "0 issue \"letsencrypt.org\"");
    }

    #[test]
    fn txt_targets_are_quoted_once() {
        let plain = fields("@", "TXT", "", "v=spf1 -all").validate(&zone()).unwrap();
        assert_eq!(plain.target(), "\"v=spf1 -all\"");
        let quoted = fields("@", "TXT", "", "\"v=spf1 -all\"").validate(&zone()).unwrap();
        assert_eq!(quoted.target(), "\"v=spf1 -all\"");
        let inner = fields("@", "TXT", "", "say \"hi\"").validate(&zone()).unwrap();
        assert_eq!(inner.target(), "\"say \\\"hi\\\"\"");
        assert!(fields("@", "TXT", "", "\"a\"b\"").validate(&zone()).is_err());
    }

    #[test]
    fn malformed_fields_are_rejected() {
        assert!(matches!(
            fields("a..b", "A", "", "192.0.2.1").validate(&zone()),
            Err(ValidationError::Owner(_)),
        ));
        assert!(matches!(
            fields("www", "SOA", "", "x").validate(&zone()),
            Err(ValidationError::Type(_)),
        ));
        assert!(matches!(
            fields("www", "A", "0", "192.0.2.1").validate(&zone()),
            Err(ValidationError::Ttl(TtlError::Zero)),
        ));
        assert!(matches!(
            fields("www", "A", "", "not-an-address").validate(&zone()),
            Err(ValidationError::Target(_)),
        ));
        assert!(matches!(
            fields("www", "A", "", "").validate(&zone()),
            Err(ValidationError::Target(_)),
        ));
        assert!(matches!(
            fields("www", "CNAME", "", "host\nevil IN A 1.2.3.4").validate(&zone()),
            Err(ValidationError::Target(_)),
        ));
        assert!(matches!(
            fields("@", "CNAME", "", "elsewhere.example.").validate(&zone()),
            Err(ValidationError::Target(_)),
        ));
        assert!(matches!(
            fields("@", "MX", "", "mail").validate(&zone()),
            Err(ValidationError::Target(_)),
        ));
    }

    #[test]
    fn absolute_apex_owner_is_the_apex() {
        assert!(matches!(
            fields("Example.COM.", "CNAME", "", "elsewhere.example.").validate(&zone()),
            Err(ValidationError::Target(_)),
        ));

        let absolute = fields("example.com.", "A", "", "192.0.2.1")
            .validate(&zone())
            .unwrap();
        let relative = fields("@", "A", "", "192.0.2.1").validate(&zone()).unwrap();
        assert!(absolute.owner().is_apex());
        assert_eq!(absolute.id(), relative.id());

        // Other absolute names and the bare zone name are not the apex.
        let other = fields("www.example.com.", "CNAME", "", "elsewhere.example.")
            .validate(&zone())
            .unwrap();
        assert_eq!(other.owner().as_str(), "www.example.com.");
        let relative_name = fields("example.com", "A", "", "192.0.2.1")
            .validate(&zone())
            .unwrap();
        assert!(!relative_name.owner().is_apex());
    }
}

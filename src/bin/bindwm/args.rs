// Copyright 2022 Matthew Ingwersen.
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

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use bindwm::domain::RecordFields;
use bindwm::name::Name;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// Manage the zones of a BIND name server
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options selecting the configuration. Either a configuration file or
/// the catalog and zone directories must be given.
#[derive(Debug, clap::Args)]
#[command(group(ArgGroup::new("source").required(true).args(["config", "catalog"])))]
pub struct ConfigArgs {
    /// Set the configuration file to use
    #[arg(
        long,
        conflicts_with_all = ["catalog", "zone_dir", "hostmaster", "rndc"],
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,

    /// Set the catalog directory
    #[arg(long, requires = "zone_dir", value_name = "DIR")]
    pub catalog: Option<PathBuf>,

    /// Set the directory for generated zone files
    #[arg(long, requires = "catalog", value_name = "DIR")]
    pub zone_dir: Option<PathBuf>,

    /// Set the SOA responsible mailbox (default: hostmaster.<domain>)
    #[arg(long, value_name = "NAME")]
    pub hostmaster: Option<Name>,

    /// Set the rndc program to run
    #[arg(long, value_name = "PROGRAM")]
    pub rndc: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a domain with no records
    CreateDomain {
        /// The domain name
        name: String,
    },

    /// Delete a domain (its zone file is kept)
    DeleteDomain {
        /// The domain name
        name: String,
    },

    /// Add a record to a domain, or change the TTL of an existing one
    AddRecord(AddRecordArgs),

    /// Delete a record from a domain
    DeleteRecord {
        /// The domain name
        domain: String,

        /// The record ID, as shown by `show`
        id: String,
    },

    /// List the domains in the catalog
    List,

    /// Show a domain and its records
    Show {
        /// The domain name
        name: String,
    },

    /// Rewrite a domain's zone file from the catalog and reload it
    Resync {
        /// The domain name
        name: String,
    },

    /// List zone files that have no domain in the catalog
    Orphans,
}

#[derive(Debug, clap::Args)]
pub struct AddRecordArgs {
    /// The domain name
    pub domain: String,

    /// The owner name, relative to the domain (`@` for the apex)
    pub name: String,

    /// The record type (A, AAAA, CAA, CNAME, MX, NS, PTR, SRV, TXT)
    #[arg(value_name = "TYPE")]
    pub rr_type: String,

    /// The record data; multiple words are joined with spaces
    #[arg(required = true, num_args = 1.., value_name = "TARGET")]
    pub target: Vec<String>,

    /// Set the TTL in seconds (default: 600)
    #[arg(long, default_value = "")]
    pub ttl: String,
}

impl AddRecordArgs {
    /// Converts the arguments into the fields of the record to add.
    pub fn fields(&self) -> RecordFields {
        RecordFields {
            name: self.name.clone(),
            rr_type: self.rr_type.clone(),
            ttl: self.ttl.clone(),
            target: self.target.join(" "),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn add_record_joins_target_words() {
        let args = Args::try_parse_from([
            "bindwm",
            "--catalog",
            "catalog",
            "--zone-dir",
            "zones",
            "add-record",
            "example.com",
            "@",
            "MX",
            "10",
            "mail",
            "--ttl",
            "300",
        ])
        .unwrap();
        match args.command {
            Command::AddRecord(add) => {
                let fields = add.fields();
                assert_eq!(fields.name, "@");
                assert_eq!(fields.rr_type, "MX");
                assert_eq!(fields.ttl, "300");
                assert_eq!(fields.target, "10 mail");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn configuration_source_is_required() {
        assert!(Args::try_parse_from(["bindwm", "list"]).is_err());
        assert!(Args::try_parse_from(["bindwm", "--catalog", "c", "list"]).is_err());
        assert!(Args::try_parse_from([
            "bindwm",
            "--config",
            "bindwm.toml",
            "--catalog",
            "c",
            "list"
        ])
        .is_err());
        assert!(Args::try_parse_from(["bindwm", "--config", "bindwm.toml", "list"]).is_ok());
    }
}

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

//! Runs the subcommands against the configured catalog and name server.

use std::fmt::Write;
use std::fs;
use std::process;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{debug, error};

use bindwm::control::Rndc;
use bindwm::domain::Domain;
use bindwm::engine::Engine;
use bindwm::store::{Catalog, DirStore};
use bindwm::zone_file::{RenderOptions, ZoneFiles};

use crate::args::{Args, Command};
use crate::config::{self, Config};

/// The specific [`Engine`] type we use.
type BindEngine = Engine<DirStore, Rndc>;

/// Runs the command given by `args`, exiting the process with a failure
/// status if it fails.
pub fn run(args: Args) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_running(args) {
        let mut message = String::from("Failed:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        error!("{}", message);
        process::exit(1);
    }
}

fn try_running(args: Args) -> Result<()> {
    let Args {
        config: config_args,
        command,
    } = args;

    // Get the configuration, either from the file system or from the
    // command line arguments, as appropriate.
    let config = if let Some(ref config_path) = config_args.config {
        debug!("Loading the configuration from {}.", config_path.display());
        config::load_from_path(config_path).context("failed to load the configuration")?
    } else {
        config::load_from_args(config_args).context("failed to load the configuration")?
    };
    let engine = open_engine(&config)?;

    match command {
        Command::CreateDomain { name } => {
            let domain = engine
                .create_domain(&name)
                .context("failed to create the domain")?;
            print_domain(&domain);
        }
        Command::DeleteDomain { name } => {
            let domain = engine
                .delete_domain(&name)
                .context("failed to delete the domain")?;
            println!(
                "Deleted {} at serial {}; its zone file remains at {}.",
                domain.name(),
                domain.serial(),
                engine.zone_files().path_for(domain.name()).display(),
            );
        }
        Command::AddRecord(add) => {
            let domain = engine
                .upsert_record(&add.domain, &add.fields())
                .context("failed to add the record")?;
            print_domain(&domain);
        }
        Command::DeleteRecord { domain, id } => {
            let domain = engine
                .delete_record(&domain, &id)
                .context("failed to delete the record")?;
            print_domain(&domain);
        }
        Command::List => {
            for domain in engine.domains().context("failed to list the domains")? {
                println!(
                    "{}\tserial {}\t{} records",
                    domain.name(),
                    domain.serial(),
                    domain.records().len(),
                );
            }
        }
        Command::Show { name } => {
            let domain = engine.domain(&name).context("failed to look up the domain")?;
            print_domain(&domain);
        }
        Command::Resync { name } => {
            let domain = engine
                .resync_domain(&name)
                .context("failed to resynchronize the domain")?;
            print_domain(&domain);
        }
        Command::Orphans => {
            for path in engine
                .orphaned_artifacts()
                .context("failed to look for orphaned zone files")?
            {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

/// Opens the catalog, the zone file directory, and the control channel
/// given by `config`.
fn open_engine(config: &Config) -> Result<BindEngine> {
    let store = DirStore::open(&config.catalog).with_context(|| {
        format!("failed to open the catalog at {}", config.catalog.display())
    })?;

    // rndc hands the zone file path to the name server verbatim, so it
    // must not depend on our working directory.
    fs::create_dir_all(&config.zone_dir).with_context(|| {
        format!(
            "failed to create the zone file directory {}",
            config.zone_dir.display()
        )
    })?;
    let zone_dir = fs::canonicalize(&config.zone_dir).with_context(|| {
        format!(
            "failed to resolve the zone file directory {}",
            config.zone_dir.display()
        )
    })?;

    let options = RenderOptions {
        hostmaster: config.hostmaster.as_ref().map(|h| h.0.clone()),
    };
    Ok(Engine::new(
        Catalog::new(store),
        ZoneFiles::new(zone_dir, options),
        config.rndc.build(),
    ))
}

/// Prints a domain and its records.
fn print_domain(domain: &Domain) {
    println!(
        "{}\tserial {}\tcreated {}",
        domain.name(),
        domain.serial(),
        domain.created().to_rfc3339(),
    );
    for record in domain.records() {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.id(),
            record.owner(),
            u32::from(record.ttl()),
            record.rr_type(),
            record.target(),
        );
    }
}

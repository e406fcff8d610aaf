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

//! Implements the configuration file.

use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use bindwm::control::Rndc;
use bindwm::name::Name;

use crate::args::ConfigArgs;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the configuration from the file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let dir = match path.as_ref().parent() {
        Some(p) => p,
        None => return Err(anyhow!("the configuration file path has no parent")),
    };
    let raw_config = fs::read(path.as_ref()).context("failed to read the configuration file")?;
    let config = parse(&raw_config, dir).context("failed to parse the configuration file")?;
    log_config_summary(&config);
    Ok(config)
}

/// Parses a configuration file read from the directory `dir`.
///
/// All relative paths in the file are interpreted relative to the
/// configuration file's directory.
fn parse(raw_config: &[u8], dir: &Path) -> Result<Config> {
    let mut config: Config = toml::from_slice(raw_config)?;
    resolve(&mut config.catalog, dir);
    resolve(&mut config.zone_dir, dir);
    if let Some(ref mut rndc_config) = config.rndc.config {
        resolve(rndc_config, dir);
    }
    if let Some(ref mut key_file) = config.rndc.key_file {
        resolve(key_file, dir);
    }

    // A bare program name is looked up in the PATH; only a program
    // given as a path is resolved.
    if config.rndc.program.components().count() > 1 {
        resolve(&mut config.rndc.program, dir);
    }
    Ok(config)
}

fn resolve(path: &mut PathBuf, dir: &Path) {
    if path.is_relative() {
        *path = dir.join(&*path);
    }
}

/// Loads the configuration from the parsed command line arguments
/// given by `args`.
pub fn load_from_args(args: ConfigArgs) -> Result<Config> {
    let (catalog, zone_dir) = match (args.catalog, args.zone_dir) {
        (Some(catalog), Some(zone_dir)) => (catalog, zone_dir),
        _ => {
            return Err(anyhow!(
                "without a configuration file, both --catalog and --zone-dir are required"
            ))
        }
    };

    let mut rndc = RndcConfig::default();
    if let Some(program) = args.rndc {
        rndc.program = program;
    }

    let config = Config {
        catalog,
        zone_dir,
        hostmaster: args.hostmaster.map(ConfigName),
        rndc,
    };
    log_config_summary(&config);
    Ok(config)
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &Config) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    let mut message = format!(
        "Configuration loaded:\n\
         Catalog:    {}\n\
         Zone files: {}\n\
         Hostmaster: ",
        config.catalog.display(),
        config.zone_dir.display(),
    );
    match config.hostmaster {
        Some(ref hostmaster) => write!(message, "{}", hostmaster.0).unwrap(),
        None => message.push_str("hostmaster.<domain>"),
    }
    write!(message, "\nrndc:       {}", config.rndc.program.display()).unwrap();
    if let Some(ref server) = config.rndc.server {
        write!(message, " -s {server}").unwrap();
    }
    if let Some(port) = config.rndc.port {
        write!(message, " -p {port}").unwrap();
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub catalog: PathBuf,
    pub zone_dir: PathBuf,
    pub hostmaster: Option<ConfigName>,
    #[serde(default)]
    pub rndc: RndcConfig,
}

/// The configuration of the `rndc` control channel.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RndcConfig {
    #[serde(default = "default_rndc_program")]
    pub program: PathBuf,
    pub config: Option<PathBuf>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub key_file: Option<PathBuf>,
}

fn default_rndc_program() -> PathBuf {
    PathBuf::from("rndc")
}

impl Default for RndcConfig {
    fn default() -> Self {
        Self {
            program: default_rndc_program(),
            config: None,
            server: None,
            port: None,
            key_file: None,
        }
    }
}

impl RndcConfig {
    /// Creates the [`Rndc`] control channel with this configuration.
    pub fn build(&self) -> Rndc {
        let mut rndc = Rndc::new(&self.program);
        if let Some(ref config) = self.config {
            rndc = rndc.config(config);
        }
        if let Some(ref server) = self.server {
            rndc = rndc.server(server);
        }
        if let Some(port) = self.port {
            rndc = rndc.port(port);
        }
        if let Some(ref key_file) = self.key_file {
            rndc = rndc.key_file(key_file);
        }
        rndc
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER BINDWM TYPES FOR SERDE                               //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`bindwm`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a [`bindwm`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigName, Name, "domain name");

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

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

//! Implementation of the `rndc`-based [`ControlChannel`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, log_enabled, Level};

use super::{ControlChannel, Error, ErrorKind, Operation};
use crate::name::Name;

/// A [`ControlChannel`] that runs BIND's `rndc` utility.
///
/// Zones are added with `rndc addzone`, which requires
/// `allow-new-zones yes;` in the name server's configuration. The zone
/// file path handed to `addzone` is used verbatim, so it should be
/// absolute or relative to the name server's working directory.
#[derive(Clone, Debug)]
pub struct Rndc {
    program: PathBuf,
    config: Option<PathBuf>,
    server: Option<String>,
    port: Option<u16>,
    key_file: Option<PathBuf>,
}

impl Rndc {
    /// Creates an `Rndc` that runs `program` with rndc's default
    /// configuration.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config: None,
            server: None,
            port: None,
            key_file: None,
        }
    }

    /// Sets the rndc configuration file (`-c`).
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// Sets the server to contact (`-s`).
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Sets the control port (`-p`).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the key file (`-k`).
    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Builds the command line for an rndc invocation with the given
    /// command arguments.
    fn command(&self, args: &[&OsStr]) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(ref config) = self.config {
            command.arg("-c").arg(config);
        }
        if let Some(ref server) = self.server {
            command.arg("-s").arg(server);
        }
        if let Some(port) = self.port {
            command.arg("-p").arg(port.to_string());
        }
        if let Some(ref key_file) = self.key_file {
            command.arg("-k").arg(key_file);
        }
        command.args(args);
        command
    }

    /// Runs rndc and maps its outcome to a control channel result.
    fn run(&self, operation: Operation, zone: &Name, args: &[&OsStr]) -> Result<(), Error> {
        let mut command = self.command(args);
        debug!("Running {:?}.", command);

        let output = command.output().map_err(|e| {
            Error::new(
                operation,
                zone.clone(),
                ErrorKind::Failed(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                )),
            )
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim();

        if output.status.success() {
            if log_enabled!(Level::Debug) && !text.is_empty() {
                debug!("rndc output for {} {}: {}", operation, zone, text);
            }
            Ok(())
        } else {
            Err(Error::new(operation, zone.clone(), classify(text)))
        }
    }
}

impl ControlChannel for Rndc {
    fn add_zone(&self, name: &Name, path: &Path) -> Result<(), Error> {
        let zone_config = format!(
            "{{ type primary; file \"{}\"; }};",
            escape_quoted(&path.to_string_lossy()),
        );
        let args = [
            OsStr::new("addzone"),
            OsStr::new(name.as_str()),
            OsStr::new(&zone_config),
        ];
        self.run(Operation::AddZone, name, &args)
    }

    fn delete_zone(&self, name: &Name) -> Result<(), Error> {
        let args = [OsStr::new("delzone"), OsStr::new(name.as_str())];
        self.run(Operation::DeleteZone, name, &args)
    }

    fn reload_zone(&self, name: &Name) -> Result<(), Error> {
        let args = [OsStr::new("reload"), OsStr::new(name.as_str())];
        self.run(Operation::ReloadZone, name, &args)
    }
}

/// Maps rndc's diagnostic output to an [`ErrorKind`].
fn classify(output: &str) -> ErrorKind {
    let lower = output.to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    // rndc reports an unknown zone as "'<command>' failed: not found",
    // possibly followed by "no matching zone ...". Other messages that
    // merely contain "not found" (e.g., a missing file) are failures.
    let zone_not_found = lower
        .lines()
        .any(|line| line.trim_end().ends_with("failed: not found"));

    if mentions(&["already exists"]) {
        ErrorKind::AlreadyExists
    } else if zone_not_found || mentions(&["no matching zone"]) {
        ErrorKind::NotFound
    } else if mentions(&[
        "connection refused",
        "connect failed",
        "timed out",
        "try again",
        "busy",
    ]) {
        ErrorKind::Transient(output.to_owned())
    } else {
        ErrorKind::Failed(output.to_owned())
    }
}

/// Escapes `"` and `\` for use inside a quoted string in named.conf
/// syntax.
fn escape_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_includes_connection_options() {
        let rndc = Rndc::new("/usr/sbin/rndc")
            .config("/etc/rndc.conf")
            .server("127.0.0.1")
            .port(953)
            .key_file("/etc/rndc.key");
        let command = rndc.command(&[OsStr::new("reload"), OsStr::new("example.com")]);
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(command.get_program(), "/usr/sbin/rndc");
        assert_eq!(
            args,
            [
                "-c",
                "/etc/rndc.conf",
                "-s",
                "127.0.0.1",
                "-p",
                "953",
                "-k",
                "/etc/rndc.key",
                "reload",
                "example.com",
            ],
        );
    }

    #[test]
    fn output_is_classified() {
        assert_eq!(
            classify("rndc: 'addzone' failed: already exists"),
            ErrorKind::AlreadyExists,
        );
        assert_eq!(
            classify("rndc: 'delzone' failed: not found\nno matching zone 'x' in any view"),
            ErrorKind::NotFound,
        );
        assert_eq!(classify("rndc: 'reload' failed: not found"), ErrorKind::NotFound);
        assert!(matches!(
            classify("rndc: connect failed: 127.0.0.1#953: connection refused"),
            ErrorKind::Transient(_),
        ));
        assert_eq!(
            classify("rndc: 'reload' failed: bad zone"),
            ErrorKind::Failed("rndc: 'reload' failed: bad zone".into()),
        );
    }

    #[test]
    fn other_missing_things_are_failures() {
        for output in [
            "rndc: 'reload' failed: file not found",
            "rndc: open: /etc/rndc.key: file not found",
            "rndc: 'addzone' failed: zone file /var/named/x.zone does not exist",
        ] {
            assert_eq!(classify(output), ErrorKind::Failed(output.into()));
        }
    }

    #[test]
    fn quoted_paths_are_escaped() {
        assert_eq!(escape_quoted(r#"/var/named/a"b\c.zone"#), r#"/var/named/a\"b\\c.zone"#);
    }

    #[test]
    fn missing_program_is_a_failure() {
        let rndc = Rndc::new("/nonexistent/bindwm-test/rndc");
        let zone: Name = "example.com".parse().unwrap();
        let e = rndc.reload_zone(&zone).unwrap_err();
        assert_eq!(e.operation(), Operation::ReloadZone);
        assert!(matches!(e.kind(), ErrorKind::Failed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_classified() {
        let rndc = Rndc::new("false");
        let zone: Name = "example.com".parse().unwrap();
        let e = rndc.delete_zone(&zone).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Failed(String::new()));
    }
}

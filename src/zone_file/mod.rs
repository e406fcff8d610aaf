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

//! Generation of zone files for the name server.
//!
//! Each managed domain has exactly one zone file, at
//! `<zone directory>/<name>.zone`. Zone files are never edited in
//! place; every change renders the whole file from the domain's state
//! (see [`render`]) and replaces the previous file in one step.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::domain::Domain;
use crate::name::Name;
use crate::util::write_atomically;

mod render;
pub use render::{render, RenderOptions};

/// The file name extension of generated zone files.
const EXTENSION: &str = "zone";

////////////////////////////////////////////////////////////////////////
// ZONE FILE DIRECTORY                                                //
////////////////////////////////////////////////////////////////////////

/// The directory of generated zone files.
#[derive(Clone, Debug)]
pub struct ZoneFiles {
    dir: PathBuf,
    options: RenderOptions,
}

impl ZoneFiles {
    /// Creates a `ZoneFiles` writing into `dir` with the given render
    /// options. The directory is not touched until the first write.
    pub fn new(dir: impl Into<PathBuf>, options: RenderOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the canonical path of the zone file for `name`.
    pub fn path_for(&self, name: &Name) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Renders `domain` and replaces its zone file with the result,
    /// returning the path written.
    pub fn write(&self, domain: &Domain) -> io::Result<PathBuf> {
        let path = self.path_for(domain.name());
        let text = render(domain, &self.options);
        write_atomically(&path, text.as_bytes())?;
        debug!(
            "Wrote {} (serial {}, {} records).",
            path.display(),
            domain.serial(),
            domain.records().len(),
        );
        Ok(path)
    }

    /// Lists the domain names that have a zone file in the directory.
    /// Files whose names do not form a valid domain name are skipped. A
    /// missing directory is treated as empty.
    pub fn list(&self) -> io::Result<Vec<Name>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension() != Some(OsStr::new(EXTENSION)) {
                continue;
            }
            if let Some(name) = path
                .file_stem()
                .and_then(OsStr::to_str)
                .and_then(|stem| stem.parse().ok())
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn write_replaces_whole_file_at_canonical_path() {
        let dir = TempDir::new().unwrap();
        let files = ZoneFiles::new(dir.path(), RenderOptions::default());
        let domain = Domain::new("example.com".parse().unwrap(), Utc::now());

        let path = files.write(&domain).unwrap();
        assert_eq!(path, dir.path().join("example.com.zone"));
        fs::write(&path, "garbage that must disappear\n".repeat(100)).unwrap();

        files.write(&domain).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            render(&domain, &RenderOptions::default()),
        );
    }

    #[cfg(unix)]
    #[test]
    fn written_zone_files_are_readable_by_the_name_server() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let files = ZoneFiles::new(dir.path(), RenderOptions::default());
        let domain = Domain::new("example.com".parse().unwrap(), Utc::now());
        let path = files.write(&domain).unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o044, 0o044);
    }

    #[test]
    fn write_fails_when_directory_is_missing() {
        let dir = TempDir::new().unwrap();
        let files = ZoneFiles::new(dir.path().join("absent"), RenderOptions::default());
        let domain = Domain::new("example.com".parse().unwrap(), Utc::now());
        assert!(files.write(&domain).is_err());
    }

    #[test]
    fn list_finds_zone_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.example.zone"), "").unwrap();
        fs::write(dir.path().join("a.example.zone"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("bad..name.zone"), "").unwrap();

        let files = ZoneFiles::new(dir.path(), RenderOptions::default());
        let names: Vec<String> = files
            .list()
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, ["a.example", "b.example"]);

        let missing = ZoneFiles::new(dir.path().join("absent"), RenderOptions::default());
        assert!(missing.list().unwrap().is_empty());
    }
}

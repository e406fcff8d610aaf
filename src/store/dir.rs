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

//! Implementation of the directory-backed [`DirStore`].

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Error, Store};
use crate::util::write_atomically;

const EXTENSION: &str = "json";

/// A [`Store`] that keeps each value in its own file, named
/// `<key>.json`, inside a directory.
///
/// Writes go through a temporary file that is renamed into place, so
/// each `put` is atomic with respect to readers and to crashes. Keys
/// must be non-empty, must not start with a dot, and must not contain
/// path separators.
#[derive(Debug)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Opens the store in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, Error> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(|c: char| c == '/' || c == '\\' || c == '\0')
        {
            Err(Error::InvalidKey(key.to_owned()))
        } else {
            Ok(self.dir.join(format!("{key}.{EXTENSION}")))
        }
    }
}

impl Store for DirStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(key.to_owned(), e)),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        write_atomically(&self.path_for(key)?, value).map_err(|e| Error::Io(key.to_owned(), e))
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(key.to_owned(), e)),
        }
    }

    fn scan(&self) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let scan_error = |e: io::Error| Error::Io(String::new(), e);
        let mut pairs = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(scan_error)? {
            let path = entry.map_err(scan_error)?.path();
            if path.extension() != Some(OsStr::new(EXTENSION)) {
                continue;
            }
            let key = match path.file_stem().and_then(OsStr::to_str) {
                Some(key) if !key.starts_with('.') => key.to_owned(),
                _ => continue,
            };
            match fs::read(&path) {
                Ok(value) => pairs.push((key, value)),
                // Deleted between listing and reading.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(key, e)),
            }
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(pairs)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn operations_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path().join("catalog")).unwrap();
        store.put("example.org", b"{}").unwrap();
        store.put("example.com", b"[]").unwrap();

        let reopened = DirStore::open(dir.path().join("catalog")).unwrap();
        assert_eq!(reopened.get("example.org").unwrap().as_deref(), Some(&b"{}"[..]));
        let keys: Vec<String> = reopened.scan().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["example.com", "example.org"]);

        reopened.delete("example.com").unwrap();
        reopened.delete("example.com").unwrap();
        assert_eq!(store.get("example.com").unwrap(), None);
    }

    #[test]
    fn unsafe_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        for key in ["", "../escape", ".hidden", "a/b"] {
            assert!(matches!(store.put(key, b"x"), Err(Error::InvalidKey(_))));
        }
    }

    #[test]
    fn scan_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        store.put("example.com", b"1").unwrap();
        fs::write(dir.path().join("README"), "hello").unwrap();
        fs::write(dir.path().join(".tmpXYZ.json"), "partial").unwrap();
        assert_eq!(store.scan().unwrap().len(), 1);
    }
}

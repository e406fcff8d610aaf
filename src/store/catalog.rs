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

//! Implementation of the [`Catalog`] structure.

use super::{Error, Store};
use crate::domain::Domain;
use crate::name::Name;

/// The catalog of managed domains, stored as JSON in a [`Store`] keyed
/// by domain name.
#[derive(Debug)]
pub struct Catalog<S> {
    store: S,
}

impl<S: Store> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads the domain called `name`, if it is in the catalog.
    pub fn load(&self, name: &Name) -> Result<Option<Domain>, Error> {
        match self.store.get(name.as_str())? {
            Some(value) => decode(name.as_str(), &value).map(Some),
            None => Ok(None),
        }
    }

    /// Returns whether a domain called `name` is in the catalog.
    pub fn contains(&self, name: &Name) -> Result<bool, Error> {
        Ok(self.store.get(name.as_str())?.is_some())
    }

    /// Writes `domain` to the catalog, replacing any previous state.
    pub fn commit(&self, domain: &Domain) -> Result<(), Error> {
        let key = domain.name().as_str();
        let value = serde_json::to_vec(domain).map_err(|e| Error::Encode(key.to_owned(), e))?;
        self.store.put(key, &value)
    }

    /// Removes the domain called `name` from the catalog.
    pub fn remove(&self, name: &Name) -> Result<(), Error> {
        self.store.delete(name.as_str())
    }

    /// Returns every domain in the catalog, ordered by name.
    pub fn domains(&self) -> Result<Vec<Domain>, Error> {
        self.store
            .scan()?
            .into_iter()
            .map(|(key, value)| decode(&key, &value))
            .collect()
    }
}

fn decode(key: &str, value: &[u8]) -> Result<Domain, Error> {
    serde_json::from_slice(value).map_err(|e| Error::Decode(key.to_owned(), e))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::MemoryStore;
    use super::*;
    use chrono::Utc;

    #[test]
    fn commit_load_and_remove_work() {
        let catalog = Catalog::new(MemoryStore::new());
        let name: Name = "example.com".parse().unwrap();
        assert_eq!(catalog.load(&name).unwrap(), None);

        let domain = Domain::new(name.clone(), Utc::now());
        catalog.commit(&domain).unwrap();
        assert!(catalog.contains(&name).unwrap());
        assert_eq!(catalog.load(&name).unwrap(), Some(domain.clone()));
        assert_eq!(catalog.domains().unwrap(), [domain]);

        catalog.remove(&name).unwrap();
        assert!(!catalog.contains(&name).unwrap());
    }

    #[test]
    fn corrupt_values_are_reported_with_their_key() {
        let store = MemoryStore::new();
        store.put("example.com", b"{not json").unwrap();
        let catalog = Catalog::new(&store);
        let name: Name = "example.com".parse().unwrap();
        match catalog.load(&name) {
            Err(Error::Decode(key, _)) => assert_eq!(key, "example.com"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(catalog.domains().is_err());
    }
}

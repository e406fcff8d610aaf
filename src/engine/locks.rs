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

//! Per-domain mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::name::Name;

/// A table of locks keyed by domain name.
///
/// Work on one domain name is serialized; work on different names
/// proceeds in parallel. Entries exist only while some thread holds or
/// waits for the lock of that name, so the table does not grow with
/// the number of domains ever touched.
#[derive(Debug, Default)]
pub(super) struct LockTable {
    locks: Mutex<HashMap<Name, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Runs `task` while holding the lock for `name`.
    pub(super) fn with<T, F>(&self, name: &Name, task: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = self
            .locks
            .lock()
            .unwrap()
            .entry(name.clone())
            .or_default()
            .clone();

        let result = {
            // The mutex protects no data, so a panic in another task
            // cannot have left anything inconsistent behind it.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            task()
        };

        // New references are only handed out while the table is
        // locked, so with the table locked, a count of one after
        // dropping ours means nobody else is using the entry.
        let mut locks = self.locks.lock().unwrap();
        drop(lock);
        if locks.get(name).map_or(false, |l| Arc::strong_count(l) == 1) {
            locks.remove(name);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_name_is_serialized() {
        let table = LockTable::new();
        let name: Name = "example.com".parse().unwrap();
        let counter = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10 {
                        table.with(&name, || {
                            // A lost update shows up if two tasks ever
                            // overlap here.
                            let seen = counter.load(Ordering::SeqCst);
                            thread::sleep(Duration::from_micros(200));
                            counter.store(seen + 1, Ordering::SeqCst);
                        });
                    }
                });
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), 40);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn different_names_do_not_block_each_other() {
        let table = LockTable::new();
        let a: Name = "a.example".parse().unwrap();
        let b: Name = "b.example".parse().unwrap();

        // Taking b's lock while holding a's would deadlock if the two
        // names shared a lock.
        let value = table.with(&a, || table.with(&b, || 7));
        assert_eq!(value, 7);
        assert_eq!(table.len(), 0);
    }
}

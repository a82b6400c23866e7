// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The in-memory key directory: fingerprint to [`Locator`], with no
//! synchronization of its own. Every caller reaches it through the engine's
//! single readers-writer lock, so there is nothing left for this type to
//! protect.

use crate::{hash::Fingerprint, locator::Locator};

pub(crate) type Map<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

/// Maps key fingerprints to the locators describing where their current
/// value lives.
#[derive(Default)]
pub struct KeyDirectory {
    map: Map<Fingerprint, Locator>,
}

impl KeyDirectory {
    /// Creates an empty directory, pre-sizing its backing map to `capacity`
    /// entries to avoid reallocation storms during bulk recovery.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            map: Map::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
        }
    }

    /// Inserts or replaces the locator for `fingerprint`.
    pub fn insert(&mut self, fingerprint: Fingerprint, locator: Locator) {
        self.map.insert(fingerprint, locator);
    }

    /// Looks up the current locator for `fingerprint`, if live.
    #[must_use]
    pub fn get(&self, fingerprint: Fingerprint) -> Option<Locator> {
        self.map.get(&fingerprint).copied()
    }

    /// Removes the entry for `fingerprint`, returning its prior locator if
    /// any.
    pub fn remove(&mut self, fingerprint: Fingerprint) -> Option<Locator> {
        self.map.remove(&fingerprint)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the directory holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over every `(fingerprint, locator)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (Fingerprint, Locator)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn locator() -> Locator {
        Locator {
            segment_id: 1,
            offset: 0,
            size: 10,
            create_ts: 0,
            expire_ts: 0,
        }
    }

    #[test]
    fn insert_and_get() {
        let mut dir = KeyDirectory::new(0);
        dir.insert(1, locator());
        assert_eq!(dir.get(1), Some(locator()));
        assert_eq!(dir.get(2), None);
    }

    #[test]
    fn insert_replaces() {
        let mut dir = KeyDirectory::new(0);
        dir.insert(1, locator());
        let replacement = Locator {
            offset: 50,
            ..locator()
        };
        dir.insert(1, replacement);
        assert_eq!(dir.get(1), Some(replacement));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn remove_clears_entry() {
        let mut dir = KeyDirectory::new(0);
        dir.insert(1, locator());
        assert_eq!(dir.remove(1), Some(locator()));
        assert_eq!(dir.get(1), None);
        assert!(dir.is_empty());
    }
}

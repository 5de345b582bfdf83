//! Ordered, deduplicated container of query results
//!
//! Entries are keyed by address, so the set can never hold two entries for
//! the same room, and iteration order is lexicographic by address. The set
//! itself is not synchronized: the owning query keeps it behind its state
//! mutex together with the rest of the query's mutable state.

use std::collections::BTreeMap;

use crate::domain::ResultEntry;

#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: BTreeMap<String, ResultEntry>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry`, replacing any entry with the same address.
    ///
    /// State is taken wholesale from the new entry. Returns the replaced
    /// entry, if any.
    pub fn upsert(&mut self, entry: ResultEntry) -> Option<ResultEntry> {
        self.entries.insert(entry.address.clone(), entry)
    }

    /// Remove every entry satisfying `predicate`, returning them in order
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<ResultEntry>
    where
        F: FnMut(&ResultEntry) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .values()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.address.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|address| self.entries.remove(&address))
            .collect()
    }

    pub fn remove(&mut self, address: &str) -> Option<ResultEntry> {
        self.entries.remove(address)
    }

    pub fn find(&self, address: &str) -> Option<&ResultEntry> {
        self.entries.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// Position of `entry` in iteration order
    pub fn index_of(&self, entry: &ResultEntry) -> Option<usize> {
        self.entries.keys().position(|address| *address == entry.address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.values()
    }

    /// Point-in-time copy in iteration order
    pub fn snapshot(&self) -> Vec<ResultEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Values recorded under the name of the resolver or handler that produced them.
//!
//! Each promise owns one [`NamedValues`] map. On settlement the promise writes its
//! own outcome under its current name, and every child queued on it receives a
//! copy of the whole map before its handler runs. Keys are never removed, so a
//! handler can look up any named ancestor.

use std::collections::HashMap;

use crate::state::Settlement;

/// Outcomes of a promise's ancestors, keyed by name.
///
/// Promises created by the engine itself, such as the child of an anonymous
/// handler, are named `""`. Their outcomes are recorded under that empty key,
/// so `value("")` returns the latest anonymous stage's value, and each anonymous
/// stage overwrites the one before it.
#[derive(Clone)]
pub struct NamedValues<T, E> {
    entries: HashMap<String, Settlement<T, E>>,
}

impl<T, E> NamedValues<T, E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Settlement<T, E>> {
        self.entries.get(name)
    }

    /// Fulfillment value recorded under `name`, if that stage fulfilled.
    pub fn value(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Settlement::value)
    }

    /// Rejection reason recorded under `name`, if that stage rejected.
    pub fn reason(&self, name: &str) -> Option<&E> {
        self.get(name).and_then(Settlement::reason)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn record(&mut self, name: String, settlement: Settlement<T, E>) {
        self.entries.insert(name, settlement);
    }
}

impl<T: Clone, E: Clone> NamedValues<T, E> {
    /// Copy every entry of `parent` over this map.
    pub(crate) fn inherit(&mut self, parent: &NamedValues<T, E>) {
        for (name, settlement) in &parent.entries {
            self.entries.insert(name.clone(), settlement.clone());
        }
    }
}

impl<T, E> Default for NamedValues<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> std::fmt::Debug for NamedValues<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

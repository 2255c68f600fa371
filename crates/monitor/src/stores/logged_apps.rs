#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Application names that already produced a usage event in this session.
///
/// Names are lowercased on every access. Clones share the same set.
#[derive(Debug, Default, Clone)]
pub struct LoggedApps {
    names: Arc<Mutex<HashSet<String>>>,
}

impl LoggedApps {
    fn guard(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set holds plain strings, a panic elsewhere cannot leave it torn.
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guard().contains(&name.to_lowercase())
    }

    /// Returns `true` if the name was not marked before.
    pub fn mark(&self, name: &str) -> bool {
        self.guard().insert(name.to_lowercase())
    }

    /// Returns `true` if the name was marked.
    pub fn forget(&self, name: &str) -> bool {
        self.guard().remove(&name.to_lowercase())
    }

    /// Drop every name, returning how many were marked.
    pub fn clear(&self) -> usize {
        let mut names = self.guard();
        let count = names.len();
        names.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Sorted copy of the marked names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.guard().iter().cloned().collect();
        names.sort();
        names
    }
}

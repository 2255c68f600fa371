#![forbid(unsafe_code)]

use std::collections::HashMap;

/// Pids that were classified as logged or excluded and have not exited yet,
/// keyed to their lowercased process name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunningSet {
    procs: HashMap<u32, String>,
}

impl RunningSet {
    pub fn insert(&mut self, pid: u32, name: &str) {
        self.procs.insert(pid, name.to_lowercase());
    }

    pub fn remove(&mut self, pid: u32) -> Option<String> {
        self.procs.remove(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.procs.contains_key(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<&str> {
        self.procs.get(&pid).map(String::as_str)
    }

    /// Whether any tracked pid carries this (lowercased) name.
    pub fn has_name(&self, name: &str) -> bool {
        self.procs.values().any(|other| other == name)
    }

    pub fn pids(&self) -> impl Iterator<Item = u32> + '_ {
        self.procs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

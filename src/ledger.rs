//! Durable per-index progress: which catalog indices are done, which failed
//! and need another pass, and which a pass looked at but left alone.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistenceError;
use crate::store::StateStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub index: usize,
    pub name: String,
    #[serde(rename = "error")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reason: String,
}

/// `completed` and the indices in `errors` are always disjoint.
/// `completed` is a `BTreeSet`, so it serializes in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressLedger {
    #[serde(default)]
    completed: BTreeSet<usize>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
    #[serde(default)]
    skipped: Vec<SkipEntry>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repair a ledger written by older tools: an index that is completed
    /// cannot also be errored, and `errors`/`skipped` hold one entry per index.
    pub fn normalize(&mut self) {
        let completed = &self.completed;
        self.errors.retain(|e| !completed.contains(&e.index));
        let mut seen = BTreeSet::new();
        self.errors.retain(|e| seen.insert(e.index));
        let mut seen = BTreeSet::new();
        self.skipped.retain(|s| seen.insert(s.index));
    }

    pub fn record_success(&mut self, index: usize) {
        self.errors.retain(|e| e.index != index);
        self.skipped.retain(|s| s.index != index);
        self.completed.insert(index);
    }

    /// Returns false when the index is already completed and nothing changed.
    pub fn record_error(&mut self, index: usize, name: &str, reason: &str) -> bool {
        if self.completed.contains(&index) {
            return false;
        }
        match self.errors.iter_mut().find(|e| e.index == index) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.reason = reason.to_string();
            }
            None => self.errors.push(ErrorEntry {
                index,
                name: name.to_string(),
                reason: reason.to_string(),
            }),
        }
        true
    }

    pub fn record_skip(&mut self, index: usize, name: &str, reason: &str) {
        let entry = SkipEntry {
            index,
            name: Some(name.to_string()),
            reason: reason.to_string(),
        };
        match self.skipped.iter_mut().find(|s| s.index == index) {
            Some(existing) => *existing = entry,
            None => self.skipped.push(entry),
        }
    }

    pub fn is_done(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    #[cfg(test)]
    pub fn completed(&self) -> impl Iterator<Item = usize> + '_ {
        self.completed.iter().copied()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn skipped(&self) -> &[SkipEntry] {
        &self.skipped
    }

    pub fn error_indices(&self) -> Vec<usize> {
        self.errors.iter().map(|e| e.index).collect()
    }

    pub fn persist<S: StateStore>(&self, store: &S) -> Result<(), PersistenceError> {
        store.save_ledger(self)
    }
}

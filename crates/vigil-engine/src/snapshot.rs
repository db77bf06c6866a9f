//! Generation-versioned published values.
//!
//! Each generation builds a fresh snapshot (seeded from the previous one,
//! replace-by-copy) and publishes it atomically; readers clone the `Arc`
//! and see either the old complete snapshot or the new complete one,
//! never a partial write.

use crate::instance::InstanceKey;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use vigil_common::types::Status;

/// One instance's published state for a generation.
#[derive(Debug, Clone)]
pub struct PublishedEntry {
    /// `$this` as of phase 1; `None` when the instance faulted.
    pub value: Option<f64>,
    /// Committed status going into the generation.
    pub status: Status,
}

#[derive(Debug, Default)]
pub struct GenerationSnapshot {
    generation: u64,
    entries: HashMap<InstanceKey, PublishedEntry>,
}

impl GenerationSnapshot {
    /// Seed the next generation's snapshot from the previous one, keeping
    /// only instances that still exist.
    pub fn next(previous: &GenerationSnapshot, generation: u64, live: &dyn Fn(&InstanceKey) -> bool) -> Self {
        let entries = previous
            .entries
            .iter()
            .filter(|(key, _)| live(key))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        Self {
            generation,
            entries,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Single-writer-per-key: only the owning instance's evaluator calls
    /// this, in phase 1.
    pub fn publish(&mut self, key: InstanceKey, entry: PublishedEntry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &InstanceKey) -> Option<&PublishedEntry> {
        self.entries.get(key)
    }

    /// Resolve a named cross-reference from the view of `entity_id`: the
    /// instance of that template on the same entity wins; otherwise the
    /// reference resolves only if exactly one instance of that template
    /// exists. Ambiguous or absent references are evaluation faults.
    pub fn value_of(&self, template: &str, entity_id: &str) -> Option<f64> {
        let mut sole: Option<&PublishedEntry> = None;
        let mut count = 0usize;
        for ((name, entity), entry) in &self.entries {
            if name != template {
                continue;
            }
            if entity == entity_id {
                return entry.value;
            }
            count += 1;
            sole = Some(entry);
        }
        if count == 1 {
            sole.and_then(|entry| entry.value)
        } else {
            None
        }
    }
}

/// Holder of the latest complete snapshot.
#[derive(Debug, Default)]
pub struct PublishedStore {
    current: RwLock<Arc<GenerationSnapshot>>,
}

impl PublishedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<GenerationSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn store(&self, snapshot: Arc<GenerationSnapshot>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = snapshot;
    }
}

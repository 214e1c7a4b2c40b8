// src/exec/memo.rs

//! Shared memoization table for the concurrent executor.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::graph::{Key, Value};

#[derive(Debug, Clone)]
enum Slot {
    /// Some worker owns the computation of this key.
    Claimed,
    Done(Value),
    Failed,
}

/// Node key -> computed value, with a first-claim marker.
///
/// [`MemoTable::claim`] is the only way to obtain the right to compute a key;
/// it succeeds once per key, so concurrent dispatchers can never launch the
/// same node twice.
#[derive(Debug, Default)]
pub struct MemoTable {
    slots: Mutex<HashMap<Key, Slot>>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to take ownership of computing `key`.
    ///
    /// Returns `false` if the key was already claimed, computed or failed.
    pub fn claim(&self, key: &str) -> bool {
        let mut slots = self.lock();
        if slots.contains_key(key) {
            return false;
        }
        slots.insert(key.to_string(), Slot::Claimed);
        true
    }

    pub fn complete(&self, key: &str, value: Value) {
        self.lock().insert(key.to_string(), Slot::Done(value));
    }

    pub fn fail(&self, key: &str) {
        self.lock().insert(key.to_string(), Slot::Failed);
    }

    /// Computed value of `key`, if it has finished successfully.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.lock().get(key) {
            Some(Slot::Done(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn is_claimed(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of successfully computed keys.
    pub fn completed(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Done(_)))
            .count()
    }
}

// src/exec/outcome.rs

use std::collections::BTreeMap;

use crate::errors::{Result, TaskFailure, TaskGraphError};
use crate::graph::{Key, Value};

/// Per-output result of one execution.
pub type OutputResult = std::result::Result<Value, TaskFailure>;

/// Result of executing a graph: one entry per requested output.
///
/// A failed callable only affects the outputs that depend on it; unrelated
/// outputs still carry their values.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    results: BTreeMap<Key, OutputResult>,
}

impl Outcome {
    pub(crate) fn new(results: BTreeMap<Key, OutputResult>) -> Self {
        Self { results }
    }

    pub fn get(&self, key: &str) -> Option<&OutputResult> {
        self.results.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.results.get(key).and_then(|r| r.as_ref().ok())
    }

    pub fn failure(&self, key: &str) -> Option<&TaskFailure> {
        self.results.get(key).and_then(|r| r.as_ref().err())
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(|r| r.is_ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Plain key -> value mapping, or the failure of the first (by key)
    /// failed output.
    pub fn into_values(self) -> Result<BTreeMap<Key, Value>> {
        self.results
            .into_iter()
            .map(|(key, result)| match result {
                Ok(value) => Ok((key, value)),
                Err(failure) => Err(TaskGraphError::TaskExecution(failure)),
            })
            .collect()
    }
}

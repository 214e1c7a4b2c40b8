// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::graph::Key;

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("Malformed graph: {0}")]
    MalformedGraph(String),

    #[error("Key not found: {0}")]
    KeyNotFound(Key),

    #[error("Cycle detected in task graph: {0}")]
    Cycle(String),

    #[error("Task execution failed: {0}")]
    TaskExecution(TaskFailure),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A user callable failed while computing `key`.
///
/// `chain` starts at the failing node and lists every node whose value could
/// not be computed because of it, ending at the node this failure is
/// reported for. For the failing node itself the chain is just `[key]`.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub key: Key,
    pub chain: Vec<Key>,
    pub source: Arc<anyhow::Error>,
}

impl TaskFailure {
    pub fn new(key: Key, source: anyhow::Error) -> Self {
        Self {
            chain: vec![key.clone()],
            key,
            source: Arc::new(source),
        }
    }

    /// The same failure, as seen from a node that depended on the failed one.
    pub fn propagated_to(&self, dependent: &str) -> Self {
        let mut chain = self.chain.clone();
        chain.push(dependent.to_string());
        Self {
            key: self.key.clone(),
            chain,
            source: Arc::clone(&self.source),
        }
    }

    /// The node this failure is reported for (last element of the chain).
    pub fn reported_for(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or(&self.key)
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed: {:#}", self.key, self.source)?;
        if self.chain.len() > 1 {
            write!(f, " (dependency chain: {})", self.chain.join(" -> "))?;
        }
        Ok(())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskGraphError>;

// src/graph/task_graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::{Result, TaskGraphError};
use crate::graph::{Expr, Key};

/// Direct dependencies of every node: key -> keys it references.
pub type Dependencies = BTreeMap<Key, BTreeSet<Key>>;

/// Direct consumers of every node: key -> keys that reference it.
pub type Dependents = BTreeMap<Key, BTreeSet<Key>>;

/// A task graph: node key -> node body.
///
/// Nodes are kept in key order so that every pass and every traversal is
/// deterministic regardless of how the graph was built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskGraph {
    nodes: BTreeMap<Key, Expr>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<Key>, body: Expr) -> Self {
        self.insert(key, body);
        self
    }

    /// Insert or replace a node, returning the previous body if any.
    pub fn insert(&mut self, key: impl Into<Key>, body: Expr) -> Option<Expr> {
        self.nodes.insert(key.into(), body)
    }

    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.nodes.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys directly referenced by the body of `key` (empty if unknown).
    pub fn dependencies_of(&self, key: &str) -> Result<BTreeSet<Key>> {
        match self.nodes.get(key) {
            Some(body) => body.dependencies().map_err(|e| with_node_context(key, e)),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Dependency mapping for the whole graph.
    pub fn dependencies(&self) -> Result<Dependencies> {
        self.nodes
            .iter()
            .map(|(key, body)| {
                let deps = body.dependencies().map_err(|e| with_node_context(key, e))?;
                Ok((key.clone(), deps))
            })
            .collect()
    }
}

impl<K: Into<Key>> FromIterator<(K, Expr)> for TaskGraph {
    fn from_iter<I: IntoIterator<Item = (K, Expr)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for TaskGraph {
    type Item = (Key, Expr);
    type IntoIter = std::collections::btree_map::IntoIter<Key, Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, body) in &self.nodes {
            writeln!(f, "{key} = {body}")?;
        }
        Ok(())
    }
}

/// Reverse a dependency mapping. Every key of `deps` is present in the
/// result, with an empty set when nothing consumes it.
pub fn dependents(deps: &Dependencies) -> Dependents {
    let mut out: Dependents = deps.keys().map(|k| (k.clone(), BTreeSet::new())).collect();
    for (key, uses) in deps {
        for dep in uses {
            out.entry(dep.clone()).or_default().insert(key.clone());
        }
    }
    out
}

fn with_node_context(key: &str, err: TaskGraphError) -> TaskGraphError {
    match err {
        TaskGraphError::MalformedGraph(msg) => {
            TaskGraphError::MalformedGraph(format!("node '{key}': {msg}"))
        }
        other => other,
    }
}

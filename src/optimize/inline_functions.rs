// src/optimize/inline_functions.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::Result;
use crate::graph::{Dependencies, Expr, Key, TaskGraph, dependents, topological_order};
use crate::optimize::{checked_dependencies, output_set};

/// Allow-list of callables (by name) that are cheap and side-effect free
/// enough to be recomputed inside every consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastFunctions {
    names: BTreeSet<String>,
}

impl FastFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FastFunctions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Inline tasks whose callables are all on the `fast` allow-list.
///
/// A node qualifies when it is a task, every callable in its body is
/// allow-listed, it has at least one consumer and it is not an output. Its
/// task expression replaces each reference to it, so a node with several
/// consumers is recomputed in each of them. Substitutions that would nest a
/// body deeper than [`MAX_NESTING_DEPTH`](crate::graph::MAX_NESTING_DEPTH)
/// are not made.
pub fn inline_functions<S: AsRef<str>>(
    graph: &TaskGraph,
    outputs: &[S],
    fast: &FastFunctions,
    deps: Option<&Dependencies>,
) -> Result<TaskGraph> {
    if fast.is_empty() {
        return Ok(graph.clone());
    }

    let outputs = output_set(outputs);
    let deps = checked_dependencies(graph, deps)?;
    let consumers = dependents(&deps);

    let candidates: BTreeSet<&str> = graph
        .iter()
        .filter(|(key, body)| {
            body.is_task()
                && !outputs.contains(*key)
                && consumers.get(*key).is_some_and(|c| !c.is_empty())
                && body.functions().iter().all(|f| fast.contains(f))
        })
        .map(|(key, _)| key)
        .collect();

    if candidates.is_empty() {
        return Ok(graph.clone());
    }

    // Expand in dependency order so a candidate that uses another candidate
    // already sees the expanded form. A candidate whose expansion would nest
    // too deep stays a node of its own.
    let mut expanded: BTreeMap<Key, Expr> = BTreeMap::new();
    for key in topological_order(&deps)? {
        if !candidates.contains(key.as_str()) {
            continue;
        }
        if let Some(body) = graph.get(&key) {
            let body = body.substitute(&expanded);
            if body.within_nesting_limit() {
                expanded.insert(key, body);
            } else {
                debug!(node = %key, "inline_functions: expansion would nest too deep; kept");
            }
        }
    }

    // Remaining nodes get the expansions, unless that makes them too deep, in
    // which case they keep their references and the referenced candidates
    // stay in the graph.
    let mut kept: BTreeMap<Key, Expr> = BTreeMap::new();
    for (key, body) in graph.iter() {
        if expanded.contains_key(key) {
            continue;
        }
        let substituted = body.substitute(&expanded);
        let body = if substituted.within_nesting_limit() {
            substituted
        } else {
            body.clone()
        };
        kept.insert(key.to_string(), body);
    }

    let mut still_referenced: BTreeSet<Key> = BTreeSet::new();
    for body in kept.values() {
        still_referenced.extend(body.dependencies()?);
    }
    for (key, body) in &expanded {
        if still_referenced.contains(key) {
            kept.insert(key.clone(), body.clone());
        }
    }

    let inlined: TaskGraph = kept.into_iter().collect();

    debug!(
        before = graph.len(),
        after = inlined.len(),
        fast_functions = ?fast.names().collect::<Vec<_>>(),
        "inline_functions: substituted cheap tasks into consumers"
    );

    Ok(inlined)
}

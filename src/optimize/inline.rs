// src/optimize/inline.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::{Result, TaskGraphError};
use crate::graph::{Dependencies, Expr, Key, TaskGraph, dependents};
use crate::optimize::{checked_dependencies, output_set};

/// Substitute literal and alias nodes into their consumers.
///
/// A node is inlined when its body is a plain literal or an alias, it has at
/// least one consumer, and it is not a requested output. Alias chains are
/// followed to their end, so a reference to `a` where `a -> b -> "x"` becomes
/// the literal `"x"`. Task nodes are never touched here.
pub fn inline<S: AsRef<str>>(
    graph: &TaskGraph,
    outputs: &[S],
    deps: Option<&Dependencies>,
) -> Result<TaskGraph> {
    let outputs = output_set(outputs);
    let deps = checked_dependencies(graph, deps)?;
    let consumers = dependents(&deps);

    let candidates: BTreeSet<&str> = graph
        .iter()
        .filter(|(key, body)| {
            matches!(body, Expr::Literal(_) | Expr::Ref(_))
                && !outputs.contains(*key)
                && consumers.get(*key).is_some_and(|c| !c.is_empty())
        })
        .map(|(key, _)| key)
        .collect();

    if candidates.is_empty() {
        return Ok(graph.clone());
    }

    let mut replacements: BTreeMap<Key, Expr> = BTreeMap::new();
    for key in &candidates {
        let resolved = resolve_alias_chain(graph, &candidates, key)?;
        replacements.insert(key.to_string(), resolved);
    }

    let inlined: TaskGraph = graph
        .iter()
        .filter(|(key, _)| !candidates.contains(key))
        .map(|(key, body)| (key, body.substitute(&replacements)))
        .collect();

    debug!(
        before = graph.len(),
        after = inlined.len(),
        inlined = candidates.len(),
        "inline: substituted literal and alias nodes"
    );

    Ok(inlined)
}

/// Follow aliases starting at `key` until reaching a literal, or a reference
/// to a node that stays in the graph.
fn resolve_alias_chain(graph: &TaskGraph, candidates: &BTreeSet<&str>, key: &str) -> Result<Expr> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut current = key;

    loop {
        if !seen.insert(current) {
            return Err(TaskGraphError::Cycle(format!(
                "alias cycle detected involving node '{current}'"
            )));
        }

        match graph.get(current) {
            Some(Expr::Ref(target)) if candidates.contains(target.as_str()) => {
                current = target.as_str();
            }
            Some(body) => return Ok(body.clone()),
            None => {
                return Err(TaskGraphError::MalformedGraph(format!(
                    "alias chain from '{key}' reaches unknown key '{current}'"
                )));
            }
        }
    }
}

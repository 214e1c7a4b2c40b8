// src/optimize/cull.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{Result, TaskGraphError};
use crate::graph::{Dependencies, Key, TaskGraph};
use crate::optimize::output_set;

/// Keep only the nodes needed to compute `outputs`.
///
/// Returns the culled graph together with its dependency mapping. An output
/// key missing from `graph` is a [`TaskGraphError::KeyNotFound`]; a reference
/// to a missing key met during the traversal is a
/// [`TaskGraphError::MalformedGraph`].
pub fn cull<S: AsRef<str>>(graph: &TaskGraph, outputs: &[S]) -> Result<(TaskGraph, Dependencies)> {
    let outputs = output_set(outputs);

    for key in &outputs {
        if !graph.contains_key(key) {
            return Err(TaskGraphError::KeyNotFound(key.clone()));
        }
    }

    let mut stack: Vec<Key> = outputs.iter().rev().cloned().collect();
    let mut deps: Dependencies = BTreeMap::new();

    while let Some(name) = stack.pop() {
        if deps.contains_key(&name) {
            continue;
        }

        let uses = graph.dependencies_of(&name)?;
        for dep in &uses {
            if !graph.contains_key(dep) {
                return Err(TaskGraphError::MalformedGraph(format!(
                    "node '{name}' references unknown key '{dep}'"
                )));
            }
            if !deps.contains_key(dep) {
                stack.push(dep.clone());
            }
        }
        deps.insert(name, uses);
    }

    let culled: TaskGraph = graph
        .iter()
        .filter(|(key, _)| deps.contains_key(*key))
        .map(|(key, body)| (key, body.clone()))
        .collect();

    debug!(
        before = graph.len(),
        after = culled.len(),
        "cull: removed nodes not needed for outputs"
    );

    Ok((culled, deps))
}

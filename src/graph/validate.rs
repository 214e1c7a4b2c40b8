// src/graph/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskGraphError};
use crate::graph::{Dependencies, Key, TaskGraph};

/// Check that a graph is well formed and return its dependency mapping.
///
/// This checks:
/// - no node body nests deeper than [`MAX_NESTING_DEPTH`](crate::graph::MAX_NESTING_DEPTH)
/// - every referenced key exists in the graph
/// - the dependency graph has no cycles
pub fn validate_graph(graph: &TaskGraph) -> Result<Dependencies> {
    let deps = graph.dependencies()?;
    check_references(graph, &deps)?;
    topological_order(&deps)?;
    Ok(deps)
}

/// Reject references to keys that are not defined in `graph`.
pub fn check_references(graph: &TaskGraph, deps: &Dependencies) -> Result<()> {
    for (key, uses) in deps {
        for dep in uses {
            if !graph.contains_key(dep) {
                return Err(TaskGraphError::MalformedGraph(format!(
                    "node '{key}' references unknown key '{dep}'"
                )));
            }
        }
    }
    Ok(())
}

/// Dependency-first ordering of the keys in `deps`.
///
/// Edge direction is dep -> node, so a node always comes after everything it
/// references. Keys only mentioned as dependencies are included too.
pub fn topological_order(deps: &Dependencies) -> Result<Vec<Key>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for key in deps.keys() {
        graph.add_node(key.as_str());
    }

    for (key, uses) in deps {
        for dep in uses {
            graph.add_edge(dep.as_str(), key.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskGraphError::Cycle(format!(
                "cycle detected in task graph involving node '{}'",
                node
            )))
        }
    }
}

// src/exec/plan.rs

//! Validation and ordering shared by both execution strategies.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::anyhow;

use crate::errors::{Result, TaskFailure, TaskGraphError};
use crate::exec::Outcome;
use crate::graph::{
    Dependencies, Dependents, Key, TaskGraph, Value, dependents, topological_order,
};
use crate::optimize::{cull, output_set};

/// Everything an executor needs to know before running a single callable.
///
/// Building a plan performs all structural checks (missing outputs,
/// dangling references, excessive nesting, cycles), so no user code runs
/// unless the graph is sound.
#[derive(Debug)]
pub struct ExecutionPlan {
    pub graph: TaskGraph,
    pub deps: Dependencies,
    pub dependents: Dependents,
    /// Dependency-first order of every node in `graph`.
    pub order: Vec<Key>,
    pub outputs: BTreeSet<Key>,
}

impl ExecutionPlan {
    pub fn new<S: AsRef<str>>(graph: &TaskGraph, outputs: &[S]) -> Result<Self> {
        let (graph, deps) = cull(graph, outputs)?;
        let order = topological_order(&deps)?;
        let dependents = dependents(&deps);

        Ok(Self {
            graph,
            deps,
            dependents,
            order,
            outputs: output_set(outputs),
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn dependencies_of(&self, key: &str) -> impl Iterator<Item = &Key> {
        self.deps.get(key).into_iter().flatten()
    }

    pub fn dependents_of(&self, key: &str) -> impl Iterator<Item = &Key> {
        self.dependents.get(key).into_iter().flatten()
    }

    /// Failure inherited by `key` from its dependencies, if any failed.
    ///
    /// When several dependencies failed, the one with the smallest key wins so
    /// that every strategy reports the same chain.
    pub fn inherited_failure(
        &self,
        key: &str,
        failures: &BTreeMap<Key, TaskFailure>,
    ) -> Option<TaskFailure> {
        self.dependencies_of(key)
            .find_map(|dep| failures.get(dep))
            .map(|failure| failure.propagated_to(key))
    }

    /// Assemble the per-output report once every node has either a value or
    /// a failure.
    pub fn outcome<F>(&self, resolve: F, failures: &BTreeMap<Key, TaskFailure>) -> Result<Outcome>
    where
        F: Fn(&str) -> Option<Value>,
    {
        let mut results = BTreeMap::new();
        for key in &self.outputs {
            let result = match (resolve(key), failures.get(key)) {
                (Some(value), _) => Ok(value),
                (None, Some(failure)) => Err(failure.clone()),
                (None, None) => {
                    return Err(TaskGraphError::Other(anyhow!(
                        "output '{key}' finished without a value or a failure"
                    )));
                }
            };
            results.insert(key.clone(), result);
        }
        Ok(Outcome::new(results))
    }

    /// Every node downstream of `key` (not including `key`).
    pub fn transitive_dependents(&self, key: &str) -> BTreeSet<Key> {
        let mut stack: Vec<&Key> = self.dependents_of(key).collect();
        let mut out = BTreeSet::new();

        while let Some(name) = stack.pop() {
            if out.insert(name.clone()) {
                stack.extend(self.dependents_of(name));
            }
        }

        out
    }
}

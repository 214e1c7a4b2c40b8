// src/exec/sync.rs

//! Single-threaded executor.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskFailure, TaskGraphError};
use crate::exec::{ExecutionPlan, Executor, Outcome, panic_error};
use crate::graph::{Key, TaskGraph, Value};

/// Evaluates nodes one at a time in dependency order.
///
/// Each node is evaluated at most once and its value memoized, so a node
/// shared by many consumers (and any side effect of its callable) runs once.
#[derive(Debug, Clone, Default)]
pub struct SyncExecutor {
    fail_fast: bool,
}

impl SyncExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop at the first failing callable and return it as an error.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn run(&self, plan: &ExecutionPlan) -> Result<Outcome> {
        info!(nodes = plan.len(), outputs = plan.outputs.len(), "sync executor: starting");

        let mut memo: HashMap<Key, Value> = HashMap::with_capacity(plan.len());
        let mut failures: BTreeMap<Key, TaskFailure> = BTreeMap::new();

        for key in &plan.order {
            if let Some(failure) = plan.inherited_failure(key, &failures) {
                debug!(node = %key, root = %failure.key, "skipping node with failed dependency");
                failures.insert(key.clone(), failure);
                continue;
            }

            let body = plan.graph.get(key).ok_or_else(|| {
                TaskGraphError::Other(anyhow!("planned node '{key}' missing from graph"))
            })?;

            debug!(node = %key, "evaluating node");
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                body.evaluate(&|dep: &str| memo.get(dep).cloned())
            }))
            .unwrap_or_else(|payload| Err(panic_error(payload)));

            match result {
                Ok(value) => {
                    memo.insert(key.clone(), value);
                }
                Err(source) => {
                    let failure = TaskFailure::new(key.clone(), source);
                    warn!(node = %key, error = %failure, "task failed; failing dependents");
                    if self.fail_fast {
                        return Err(TaskGraphError::TaskExecution(failure));
                    }
                    failures.insert(key.clone(), failure);
                }
            }
        }

        info!(
            computed = memo.len(),
            failed = failures.len(),
            "sync executor: finished"
        );

        plan.outcome(|key| memo.get(key).cloned(), &failures)
    }
}

impl Executor for SyncExecutor {
    fn execute(&self, graph: &TaskGraph, outputs: &[Key]) -> Result<Outcome> {
        let plan = ExecutionPlan::new(graph, outputs)?;
        self.run(&plan)
    }
}

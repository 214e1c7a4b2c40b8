// src/exec/threaded.rs

//! Worker-pool executor.
//!
//! The scheduling loop tracks how many unfinished dependencies each node
//! still has. Nodes whose count reaches zero are dispatched to tokio's
//! blocking pool (at most `num_workers` at a time). The loop then waits for
//! the next completion on an mpsc channel before deciding what became
//! ready, so scheduling decisions are made in one place while callables run
//! in parallel.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::thread;

use anyhow::anyhow;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskFailure, TaskGraphError};
use crate::exec::{ExecutionPlan, Executor, MemoTable, Outcome, panic_error};
use crate::graph::{Key, TaskGraph};

/// Completion report sent from a worker back to the scheduling loop.
type Completion = (Key, anyhow::Result<()>);

/// Runs independent nodes in parallel on a bounded worker pool.
///
/// Produces exactly the same [`Outcome`] as [`SyncExecutor`](crate::exec::SyncExecutor);
/// only the wall-clock schedule differs.
#[derive(Debug, Clone)]
pub struct ThreadedExecutor {
    num_workers: usize,
    fail_fast: bool,
}

impl Default for ThreadedExecutor {
    fn default() -> Self {
        Self::new(default_num_workers())
    }
}

impl ThreadedExecutor {
    /// `num_workers` is clamped to at least one.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            fail_fast: false,
        }
    }

    /// Stop dispatching at the first failing callable and return it as an
    /// error. Workers already running are left to finish on their own.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Execute from async code that already runs inside a tokio runtime.
    pub async fn execute_async<S: AsRef<str>>(
        &self,
        graph: &TaskGraph,
        outputs: &[S],
    ) -> Result<Outcome> {
        let plan = Arc::new(ExecutionPlan::new(graph, outputs)?);
        self.run(plan).await
    }

    async fn run(&self, plan: Arc<ExecutionPlan>) -> Result<Outcome> {
        info!(
            nodes = plan.len(),
            outputs = plan.outputs.len(),
            workers = self.num_workers,
            "threaded executor: starting"
        );

        let memo = Arc::new(MemoTable::new());
        let (tx, mut rx) = mpsc::channel::<Completion>(self.num_workers);

        let mut remaining: HashMap<&str, usize> = plan
            .order
            .iter()
            .map(|key| (key.as_str(), plan.dependencies_of(key).count()))
            .collect();
        let mut ready: VecDeque<Key> = plan
            .order
            .iter()
            .filter(|key| remaining.get(key.as_str()) == Some(&0))
            .cloned()
            .collect();

        let mut failures: BTreeMap<Key, TaskFailure> = BTreeMap::new();
        let mut blocked: BTreeSet<Key> = BTreeSet::new();
        let mut in_flight = 0usize;

        loop {
            while in_flight < self.num_workers {
                let Some(key) = ready.pop_front() else {
                    break;
                };
                if blocked.contains(&key) || !memo.claim(&key) {
                    continue;
                }
                debug!(node = %key, in_flight, "dispatching node to worker");
                spawn_worker(Arc::clone(&plan), Arc::clone(&memo), key, tx.clone());
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            let Some((key, result)) = rx.recv().await else {
                break;
            };
            in_flight -= 1;

            match result {
                Ok(()) => {
                    debug!(node = %key, "node completed");
                    for dependent in plan.dependents_of(&key) {
                        if let Some(count) = remaining.get_mut(dependent.as_str()) {
                            *count = count.saturating_sub(1);
                            if *count == 0 && !blocked.contains(dependent) {
                                ready.push_back(dependent.clone());
                            }
                        }
                    }
                }
                Err(source) => {
                    let failure = TaskFailure::new(key.clone(), source);
                    warn!(node = %key, error = %failure, "task failed; failing dependents");
                    if self.fail_fast {
                        info!(in_flight, "fail-fast: abandoning outstanding work");
                        return Err(TaskGraphError::TaskExecution(failure));
                    }
                    blocked.extend(plan.transitive_dependents(&key));
                    failures.insert(key, failure);
                }
            }
        }

        // Blocked nodes never ran; give each the failure of its dependencies,
        // walking in dependency order so chains come out the same as in the
        // synchronous executor.
        for key in &plan.order {
            if blocked.contains(key) && !failures.contains_key(key) {
                if let Some(failure) = plan.inherited_failure(key, &failures) {
                    failures.insert(key.clone(), failure);
                }
            }
        }

        info!(
            computed = memo.completed(),
            failed = failures.len(),
            "threaded executor: finished"
        );

        plan.outcome(|key| memo.get(key), &failures)
    }
}

impl Executor for ThreadedExecutor {
    /// Blocking entry point: owns a multi-threaded tokio runtime for the
    /// duration of the call.
    ///
    /// When called from inside a tokio runtime, the private runtime is driven
    /// from a helper thread and the calling thread blocks until it is done.
    /// Async callers that must not block should use
    /// [`ThreadedExecutor::execute_async`].
    fn execute(&self, graph: &TaskGraph, outputs: &[Key]) -> Result<Outcome> {
        let plan = Arc::new(ExecutionPlan::new(graph, outputs)?);

        if Handle::try_current().is_err() {
            return self.run_on_own_runtime(plan);
        }

        // A runtime cannot be blocked on from one of its own threads.
        debug!("threaded executor: inside a tokio runtime; using a helper thread");
        thread::scope(|scope| {
            let helper = thread::Builder::new()
                .name("taskdag-scheduler".to_string())
                .spawn_scoped(scope, || self.run_on_own_runtime(plan))?;
            match helper.join() {
                Ok(outcome) => outcome,
                Err(payload) => Err(TaskGraphError::Other(panic_error(payload))),
            }
        })
    }
}

impl ThreadedExecutor {
    fn run_on_own_runtime(&self, plan: Arc<ExecutionPlan>) -> Result<Outcome> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.num_workers)
            .thread_name("taskdag-worker")
            .enable_all()
            .build()?;

        let outcome = runtime.block_on(self.run(plan));
        // Do not wait for workers abandoned by fail-fast.
        runtime.shutdown_background();
        outcome
    }
}

/// Evaluate one node on the blocking pool and report back to the loop.
///
/// The worker reads dependency values from, and publishes its own value to,
/// the shared memo table. A panicking callable is reported as a failure
/// rather than leaving the loop waiting forever.
fn spawn_worker(
    plan: Arc<ExecutionPlan>,
    memo: Arc<MemoTable>,
    key: Key,
    tx: mpsc::Sender<Completion>,
) {
    let worker_key = key.clone();
    let handle = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let body = plan
            .graph
            .get(&worker_key)
            .ok_or_else(|| anyhow!("planned node '{worker_key}' missing from graph"))?;
        match body.evaluate(&|dep: &str| memo.get(dep)) {
            Ok(value) => {
                memo.complete(&worker_key, value);
                Ok(())
            }
            Err(err) => {
                memo.fail(&worker_key);
                Err(err)
            }
        }
    });

    tokio::spawn(async move {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => match join_err.try_into_panic() {
                Ok(payload) => Err(panic_error(payload)),
                Err(join_err) => Err(anyhow!("worker for '{key}' did not finish: {join_err}")),
            },
        };
        // The loop may have stopped listening after a fail-fast abort.
        let _ = tx.send((key, result)).await;
    });
}

fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

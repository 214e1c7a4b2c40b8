use std::sync::{Arc, Mutex};

use taskdag::errors::Result;
use taskdag::exec::{Executor, Outcome, SyncExecutor};
use taskdag::graph::{Key, TaskGraph};

/// An executor that:
/// - records every graph it is handed (i.e. the optimized graph)
/// - delegates the actual evaluation to a `SyncExecutor`.
pub struct RecordingExecutor {
    seen: Arc<Mutex<Vec<TaskGraph>>>,
    inner: SyncExecutor,
}

impl RecordingExecutor {
    pub fn new(seen: Arc<Mutex<Vec<TaskGraph>>>) -> Self {
        Self {
            seen,
            inner: SyncExecutor::new(),
        }
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, graph: &TaskGraph, outputs: &[Key]) -> Result<Outcome> {
        {
            let mut guard = self.seen.lock().unwrap();
            guard.push(graph.clone());
        }
        self.inner.execute(graph, outputs)
    }
}

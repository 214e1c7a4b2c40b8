// src/exec/mod.rs

//! Graph execution.
//!
//! - [`plan`] validates and orders a graph before anything runs.
//! - [`sync`] evaluates nodes one at a time on the calling thread.
//! - [`threaded`] dispatches ready nodes to a bounded worker pool.
//! - [`memo`] is the shared key -> value table with first-claim semantics.
//! - [`outcome`] is the per-output report both strategies return.

pub mod memo;
pub mod outcome;
pub mod plan;
pub mod sync;
pub mod threaded;

pub use memo::MemoTable;
pub use outcome::{Outcome, OutputResult};
pub use plan::ExecutionPlan;
pub use sync::SyncExecutor;
pub use threaded::ThreadedExecutor;

use std::any::Any;

use crate::errors::Result;
use crate::graph::{Key, TaskGraph};

/// Turn the payload of a panicking callable into an ordinary error, so a
/// panic fails its node the same way under every strategy.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    anyhow::anyhow!("callable panicked: {message}")
}

/// Trait abstracting how a graph is evaluated.
///
/// The engine picks [`SyncExecutor`] or [`ThreadedExecutor`] from its
/// configuration; tests can provide their own implementation, for example
/// one that records the graph it was handed.
pub trait Executor: Send + Sync {
    /// Compute every key in `outputs`.
    ///
    /// Structural problems (unknown output, dangling reference, cycle) are
    /// returned as `Err` before any callable runs. Callable failures are
    /// reported per output in the [`Outcome`] unless the executor runs in
    /// fail-fast mode.
    fn execute(&self, graph: &TaskGraph, outputs: &[Key]) -> Result<Outcome>;
}

// src/engine/mod.rs

//! Orchestration: optimize a graph, then execute it.
//!
//! [`Engine`] owns an [`EngineConfig`] and runs the enabled passes in a fixed
//! order (cull -> inline -> inline-functions -> fuse) before handing the
//! result to the configured executor. [`get`] is the one-call form.

use std::fmt;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::errors::{Result, TaskGraphError};
use crate::exec::{Executor, Outcome, SyncExecutor, ThreadedExecutor};
use crate::graph::{Key, TaskGraph};
use crate::optimize::{FastFunctions, cull, fuse, inline, inline_functions};
use crate::types::Strategy;

/// Optimize `graph` for `outputs` and execute it according to `config`.
pub fn get<S: AsRef<str>>(graph: &TaskGraph, outputs: &[S], config: &EngineConfig) -> Result<Outcome> {
    Engine::new(config.clone()).get(graph, outputs)
}

pub struct Engine {
    config: EngineConfig,
    executor: Box<dyn Executor>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Build an engine whose executor follows `config.engine`.
    pub fn new(config: EngineConfig) -> Self {
        let executor = executor_for(&config);
        Self { config, executor }
    }

    /// Build an engine with a caller-provided executor. The strategy,
    /// worker and fail-fast settings of `config` are then ignored.
    pub fn with_executor(config: EngineConfig, executor: Box<dyn Executor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the enabled optimization passes and return the rewritten graph.
    pub fn optimize<S: AsRef<str>>(&self, graph: &TaskGraph, outputs: &[S]) -> Result<TaskGraph> {
        for key in outputs {
            if !graph.contains_key(key.as_ref()) {
                return Err(TaskGraphError::KeyNotFound(key.as_ref().to_string()));
            }
        }

        let opts = &self.config.optimize;
        let mut current = graph.clone();
        let mut deps = None;

        if opts.cull {
            let (culled, culled_deps) = cull(&current, outputs)?;
            current = culled;
            deps = Some(culled_deps);
        }

        if opts.inline {
            current = inline(&current, outputs, deps.take().as_ref())?;
        }

        if opts.inline_functions {
            let fast: FastFunctions = opts.fast_functions.iter().cloned().collect();
            current = inline_functions(&current, outputs, &fast, deps.take().as_ref())?;
        }

        if opts.fuse {
            let (fused, _) = fuse(&current, outputs, deps.take().as_ref())?;
            current = fused;
        }

        debug!(
            before = graph.len(),
            after = current.len(),
            "engine: optimization finished"
        );

        Ok(current)
    }

    /// Optimize, then execute. The caller's graph is left untouched.
    pub fn get<S: AsRef<str>>(&self, graph: &TaskGraph, outputs: &[S]) -> Result<Outcome> {
        let optimized = self.optimize(graph, outputs)?;
        let outputs: Vec<Key> = outputs.iter().map(|s| s.as_ref().to_string()).collect();

        info!(
            strategy = %self.config.engine.strategy,
            nodes = optimized.len(),
            outputs = ?outputs,
            "engine: executing graph"
        );

        self.executor.execute(&optimized, &outputs)
    }
}

fn executor_for(config: &EngineConfig) -> Box<dyn Executor> {
    let engine = &config.engine;
    match engine.strategy {
        Strategy::Sync => Box::new(SyncExecutor::new().with_fail_fast(engine.fail_fast)),
        Strategy::Threaded => Box::new(
            ThreadedExecutor::new(engine.num_workers).with_fail_fast(engine.fail_fast),
        ),
    }
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod functions;
pub mod graph;
pub mod logging;
pub mod optimize;
pub mod types;

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{EngineConfig, GraphFile, OptimizeSection, load_from_path, load_graph_file};
use crate::engine::Engine;
use crate::functions::FunctionRegistry;

pub use crate::engine::get;
pub use crate::errors::{TaskFailure, TaskGraphError};
pub use crate::exec::Outcome;
pub use crate::graph::{Expr, Func, Key, TaskGraph, Value};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - graph file loading (with the built-in function registry)
/// - engine config (graph file, separate config file, CLI overrides)
/// - optimization + execution
/// - printing `key = value` for every requested output
pub fn run(args: CliArgs) -> Result<()> {
    let graph_path = PathBuf::from(&args.graph);
    let registry = FunctionRegistry::with_builtins();
    let file = load_graph_file(&graph_path, &registry)?;

    let config = effective_config(&args, &file)?;
    let outputs = if args.outputs.is_empty() {
        file.outputs.clone()
    } else {
        args.outputs.clone()
    };
    if outputs.is_empty() {
        bail!("no outputs requested: pass --output or set `outputs` in the graph file");
    }

    let engine = Engine::new(config);

    if args.dry_run {
        let optimized = engine.optimize(&file.graph, outputs.as_slice())?;
        print_dry_run(&file, &optimized, &outputs, engine.config());
        return Ok(());
    }

    info!(graph = %graph_path.display(), ?outputs, "running task graph");
    let outcome = engine.get(&file.graph, outputs.as_slice())?;

    let mut failed = 0usize;
    for (key, result) in outcome.iter() {
        match result {
            Ok(value) => println!("{key} = {value}"),
            Err(failure) => {
                failed += 1;
                println!("{key} FAILED: {failure}");
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} output(s) failed", outcome.len()));
    }
    Ok(())
}

/// Merge engine settings: the graph file (or `--config`), then CLI flags.
fn effective_config(args: &CliArgs, file: &GraphFile) -> Result<EngineConfig> {
    let mut raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => file.config.clone(),
    };

    if let Some(strategy) = args.strategy {
        raw.engine.strategy = strategy;
    }
    if let Some(workers) = args.workers {
        raw.engine.num_workers = workers;
    }
    if args.fail_fast {
        raw.engine.fail_fast = true;
    }
    if args.no_optimize {
        raw.optimize = OptimizeSection::disabled();
    }

    let config = EngineConfig::try_from(raw)?;
    debug!(?config, "effective engine config");
    Ok(config)
}

/// Simple dry-run output: print settings and the optimized graph.
fn print_dry_run(file: &GraphFile, optimized: &TaskGraph, outputs: &[String], cfg: &EngineConfig) {
    println!("taskdag dry-run");
    println!("  engine.strategy = {}", cfg.engine.strategy);
    println!("  engine.num_workers = {}", cfg.engine.num_workers);
    println!("  engine.fail_fast = {}", cfg.engine.fail_fast);
    println!("  optimize.fast_functions = {:?}", cfg.optimize.fast_functions);
    println!("  outputs = {outputs:?}");
    println!();

    println!("graph ({} nodes):", file.graph.len());
    print!("{}", file.graph);
    println!();

    println!("optimized ({} nodes):", optimized.len());
    print!("{optimized}");

    debug!("dry-run complete (no execution)");
}

// tests/error_handling.rs

mod common;
use crate::common::builders::{GraphBuilder, inc, lit, r};
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;

use tempfile::NamedTempFile;

use taskdag::config::{EngineConfig, load_and_validate, load_graph_file, parse_graph_file};
use taskdag::errors::TaskGraphError;
use taskdag::functions::FunctionRegistry;
use taskdag::graph::{Expr, MAX_NESTING_DEPTH, Value, validate_graph};
use taskdag::types::Strategy;

type TestResult = Result<(), Box<dyn Error>>;

fn config_file(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{contents}")?;
    Ok(file)
}

fn parse(contents: &str) -> taskdag::errors::Result<taskdag::config::GraphFile> {
    parse_graph_file(contents, &FunctionRegistry::with_builtins())
}

// ---------------------------------------------------------------------------
// engine configuration
// ---------------------------------------------------------------------------

#[test]
fn config_file_is_loaded_and_validated() -> TestResult {
    init_tracing();

    let file = config_file(
        r#"
[engine]
strategy = "threaded"
num_workers = 6
fail_fast = true

[optimize]
fuse = false
fast_functions = ["len"]
"#,
    )?;

    let config = load_and_validate(file.path())?;

    assert_eq!(config.engine.strategy, Strategy::Threaded);
    assert_eq!(config.engine.num_workers, 6);
    assert!(config.engine.fail_fast);
    assert!(!config.optimize.fuse);
    assert!(config.optimize.cull, "unspecified passes stay enabled");
    assert_eq!(config.optimize.fast_functions, vec!["len".to_string()]);
    Ok(())
}

#[test]
fn empty_config_file_gives_defaults() -> TestResult {
    let file = config_file("")?;
    let config = load_and_validate(file.path())?;

    assert_eq!(config.engine.strategy, Strategy::Sync);
    assert_eq!(config.engine.num_workers, 4);
    assert!(!config.engine.fail_fast);
    assert!(config.optimize.fast_functions.is_empty());
    Ok(())
}

#[test]
fn zero_workers_is_rejected() -> TestResult {
    let file = config_file("[engine]\nnum_workers = 0\n")?;

    match load_and_validate(file.path()) {
        Err(TaskGraphError::ConfigError(msg)) => assert!(msg.contains("num_workers"), "{msg}"),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn empty_fast_function_name_is_rejected() -> TestResult {
    let file = config_file("[optimize]\nfast_functions = [\"len\", \" \"]\n")?;

    match load_and_validate(file.path()) {
        Err(TaskGraphError::ConfigError(msg)) => {
            assert!(msg.contains("fast_functions"), "{msg}")
        }
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_strategy_is_a_toml_error() -> TestResult {
    let file = config_file("[engine]\nstrategy = \"gpu\"\n")?;

    assert!(matches!(
        load_and_validate(file.path()),
        Err(TaskGraphError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn missing_config_file_is_an_io_error() {
    let result = load_and_validate("/definitely/not/here/taskdag.toml");
    assert!(matches!(result, Err(TaskGraphError::IoError(_))), "{result:?}");
}

#[test]
fn config_round_trips_through_raw_form() -> TestResult {
    let mut raw = EngineConfig::default().into_raw();
    raw.engine.num_workers = 0;
    assert!(EngineConfig::try_from(raw.clone()).is_err());

    raw.engine.num_workers = 2;
    let config = EngineConfig::try_from(raw)?;
    assert_eq!(config.engine.num_workers, 2);
    Ok(())
}

// ---------------------------------------------------------------------------
// graph files
// ---------------------------------------------------------------------------

#[test]
fn unknown_callable_is_malformed() {
    let result = parse(
        r#"
[graph]
x = { task = "no_such_function", args = [1] }
"#,
    );

    match result {
        Err(TaskGraphError::MalformedGraph(msg)) => {
            assert!(msg.contains("no_such_function"), "{msg}");
            assert!(msg.contains("node 'x'"), "{msg}");
        }
        other => panic!("Expected MalformedGraph, got: {other:?}"),
    }
}

#[test]
fn non_string_task_head_is_malformed() {
    let result = parse("[graph]\nx = { task = 3, args = [] }\n");
    assert!(matches!(result, Err(TaskGraphError::MalformedGraph(_))), "{result:?}");
}

#[test]
fn non_string_ref_is_malformed() {
    let result = parse("[graph]\nx = { ref = 3 }\n");
    assert!(matches!(result, Err(TaskGraphError::MalformedGraph(_))), "{result:?}");
}

#[test]
fn unexpected_field_is_malformed() {
    let result = parse("[graph]\nx = { ref = \"y\", extra = true }\ny = 1\n");

    match result {
        Err(TaskGraphError::MalformedGraph(msg)) => assert!(msg.contains("extra"), "{msg}"),
        other => panic!("Expected MalformedGraph, got: {other:?}"),
    }
}

#[test]
fn args_must_be_an_array() {
    let result = parse("[graph]\nx = { task = \"inc\", args = 1 }\n");
    assert!(matches!(result, Err(TaskGraphError::MalformedGraph(_))), "{result:?}");
}

#[test]
fn dangling_reference_in_file_is_malformed() {
    let result = parse("[graph]\nx = { task = \"inc\", args = [{ ref = \"ghost\" }] }\n");

    match result {
        Err(TaskGraphError::MalformedGraph(msg)) => assert!(msg.contains("ghost"), "{msg}"),
        other => panic!("Expected MalformedGraph, got: {other:?}"),
    }
}

#[test]
fn cycle_in_file_is_rejected() {
    let result = parse(
        r#"
[graph]
a = { task = "inc", args = [{ ref = "b" }] }
b = { task = "inc", args = [{ ref = "a" }] }
"#,
    );
    assert!(matches!(result, Err(TaskGraphError::Cycle(_))), "{result:?}");
}

#[test]
fn value_escape_keeps_lists_literal() -> TestResult {
    let file = parse(
        r#"
outputs = ["n"]

[graph]
xs = { value = [1, 2, 3] }
n = { task = "len", args = [{ ref = "xs" }] }
"#,
    )?;

    assert_eq!(
        file.graph.get("xs"),
        Some(&Expr::literal(vec![1, 2, 3]))
    );
    let values = taskdag::get(&file.graph, &file.outputs, &EngineConfig::default())?.into_values()?;
    assert_eq!(values["n"], Value::Int(3));
    Ok(())
}

#[test]
fn graph_file_on_disk_reports_io_errors() {
    let result = load_graph_file("/definitely/not/here/graph.toml", &FunctionRegistry::new());
    assert!(matches!(result, Err(TaskGraphError::IoError(_))), "{result:?}");
}

// ---------------------------------------------------------------------------
// in-memory graphs
// ---------------------------------------------------------------------------

#[test]
fn excessive_nesting_is_malformed() {
    let inc = inc();
    let mut body = lit(0);
    for _ in 0..=MAX_NESTING_DEPTH + 1 {
        body = Expr::task(inc.clone(), vec![body]);
    }
    let graph = GraphBuilder::new().node("deep", body).build();

    match validate_graph(&graph) {
        Err(TaskGraphError::MalformedGraph(msg)) => assert!(msg.contains("deep"), "{msg}"),
        other => panic!("Expected MalformedGraph, got: {other:?}"),
    }
}

#[test]
fn engine_rejects_missing_outputs_even_without_cull() -> TestResult {
    let mut raw = EngineConfig::default().into_raw();
    raw.optimize = taskdag::config::OptimizeSection::disabled();
    let config = EngineConfig::try_from(raw)?;

    let graph = GraphBuilder::new()
        .literal("x", 1)
        .task("y", &inc(), vec![r("x")])
        .build();

    match taskdag::get(&graph, &["y", "z"], &config) {
        Err(TaskGraphError::KeyNotFound(key)) => assert_eq!(key, "z"),
        other => panic!("Expected KeyNotFound, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn callable_errors_carry_context() -> TestResult {
    let graph = GraphBuilder::new()
        .task("bad", &inc(), vec![lit("not a number")])
        .build();

    let outcome = taskdag::get(&graph, &["bad"], &EngineConfig::default())?;
    let failure = outcome.failure("bad").ok_or("bad should have failed")?;
    let message = failure.to_string();

    assert!(message.contains("calling 'inc'"), "{message}");
    assert!(message.contains("inc expects one int"), "{message}");
    Ok(())
}

// tests/executors.rs

mod common;
use crate::common::builders::{
    GraphBuilder, WORD_COUNT_RESULT, chain_key, counting, failing, inc, inc_chain, keys, lit, r,
    total, word_count_graph,
};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use taskdag::config::EngineConfig;
use taskdag::errors::TaskGraphError;
use taskdag::exec::{Executor, MemoTable, SyncExecutor, ThreadedExecutor};
use taskdag::engine::Engine;
use taskdag::get;
use taskdag::graph::{Func, TaskGraph, Value};

type TestResult = Result<(), Box<dyn Error>>;

fn executors() -> Vec<(&'static str, Box<dyn Executor>)> {
    vec![
        ("sync", Box::new(SyncExecutor::new()) as Box<dyn Executor>),
        ("threaded", Box::new(ThreadedExecutor::new(4)) as Box<dyn Executor>),
    ]
}

/// One shared node consumed by `fan_out` others.
fn shared_fan_out(counter: Arc<AtomicUsize>, fan_out: usize) -> TaskGraph {
    let inc = inc();
    let mut builder = GraphBuilder::new().task("shared", &counting("shared", counter), vec![lit(1)]);
    for i in 0..fan_out {
        builder = builder.task(&format!("consumer{i}"), &inc, vec![r("shared")]);
    }
    builder.build()
}

/// ```text
/// bad      = boom()
/// uses_bad = inc(bad)
/// out1     = inc(uses_bad)
/// sibling  = inc(41)
/// ```
fn failing_graph() -> TaskGraph {
    let inc = inc();
    GraphBuilder::new()
        .task("bad", &failing("boom", "kaboom"), vec![])
        .task("uses_bad", &inc, vec![r("bad")])
        .task("out1", &inc, vec![r("uses_bad")])
        .task("sibling", &inc, vec![lit(41)])
        .build()
}

#[test]
fn shared_node_is_computed_once() -> TestResult {
    init_tracing();

    for (name, executor) in executors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = shared_fan_out(Arc::clone(&counter), 8);
        let outputs: Vec<String> = (0..8).map(|i| format!("consumer{i}")).collect();

        let values = executor.execute(&graph, &outputs)?.into_values()?;

        assert_eq!(counter.load(Ordering::SeqCst), 1, "{name}: shared node ran more than once");
        assert_eq!(values.len(), 8);
        assert!(values.values().all(|v| *v == Value::Int(2)), "{name}: {values:?}");
    }
    Ok(())
}

#[test]
fn shared_node_is_computed_once_through_engine() -> TestResult {
    init_tracing();

    let counter = Arc::new(AtomicUsize::new(0));
    let graph = shared_fan_out(Arc::clone(&counter), 3);

    let outcome = get(&graph, &["consumer0", "consumer1", "consumer2"], &EngineConfig::default())?;

    assert!(outcome.is_success());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn shared_output_and_consumer_are_computed_once() -> TestResult {
    for (name, executor) in executors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = shared_fan_out(Arc::clone(&counter), 2);

        let values = executor
            .execute(&graph, &keys(&["shared", "consumer0", "consumer1"]))?
            .into_values()?;

        assert_eq!(counter.load(Ordering::SeqCst), 1, "{name}");
        assert_eq!(values["shared"], Value::Int(1));
    }
    Ok(())
}

#[test]
fn cycle_is_rejected_before_anything_runs() {
    init_tracing();

    for (name, executor) in executors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let step = counting("step", Arc::clone(&counter));
        let graph = GraphBuilder::new()
            .task("a", &step, vec![r("b")])
            .task("b", &step, vec![r("a")])
            .task("c", &step, vec![lit(1)])
            .build();

        let result = executor.execute(&graph, &keys(&["a", "c"]));

        assert!(
            matches!(result, Err(TaskGraphError::Cycle(_))),
            "{name}: expected Cycle, got {result:?}"
        );
        assert_eq!(counter.load(Ordering::SeqCst), 0, "{name}: callable ran on a cyclic graph");
    }
}

#[test]
fn self_reference_is_a_cycle() {
    let graph = GraphBuilder::new().task("a", &inc(), vec![r("a")]).build();
    let result = SyncExecutor::new().execute(&graph, &keys(&["a"]));
    assert!(matches!(result, Err(TaskGraphError::Cycle(_))), "got {result:?}");
}

#[test]
fn missing_output_is_rejected_before_anything_runs() {
    for (name, executor) in executors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = shared_fan_out(Arc::clone(&counter), 1);

        match executor.execute(&graph, &keys(&["consumer0", "nope"])) {
            Err(TaskGraphError::KeyNotFound(key)) => assert_eq!(key, "nope", "{name}"),
            other => panic!("{name}: expected KeyNotFound, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0, "{name}");
    }
}

#[test]
fn failure_is_reported_with_dependency_chain() -> TestResult {
    init_tracing();

    for (name, executor) in executors() {
        let outcome = executor.execute(&failing_graph(), &keys(&["out1", "sibling"]))?;

        assert!(!outcome.is_success());
        assert_eq!(outcome.value("sibling"), Some(&Value::Int(42)), "{name}");

        let failure = outcome.failure("out1").ok_or("out1 should have failed")?;
        assert_eq!(failure.key, "bad", "{name}");
        assert_eq!(failure.chain, vec!["bad", "uses_bad", "out1"], "{name}");
        assert_eq!(failure.reported_for(), "out1");

        let message = failure.to_string();
        assert!(message.contains("kaboom"), "{name}: {message}");
        assert!(message.contains("bad -> uses_bad -> out1"), "{name}: {message}");
    }
    Ok(())
}

#[test]
fn failure_surfaces_from_into_values() {
    let outcome = SyncExecutor::new()
        .execute(&failing_graph(), &keys(&["out1", "sibling"]))
        .expect("structural checks should pass");

    match outcome.into_values() {
        Err(TaskGraphError::TaskExecution(failure)) => {
            assert_eq!(failure.chain.last().map(String::as_str), Some("out1"));
        }
        other => panic!("Expected TaskExecution, got {other:?}"),
    }
}

#[test]
fn smallest_failed_dependency_is_reported() -> TestResult {
    let graph = GraphBuilder::new()
        .task("b_fail", &failing("boom_b", "b failed"), vec![])
        .task("a_fail", &failing("boom_a", "a failed"), vec![])
        .task("join", &total(), vec![r("b_fail"), r("a_fail")])
        .build();

    for (name, executor) in executors() {
        let outcome = executor.execute(&graph, &keys(&["join"]))?;
        let failure = outcome.failure("join").ok_or("join should have failed")?;
        assert_eq!(failure.chain, vec!["a_fail", "join"], "{name}");
    }
    Ok(())
}

#[test]
fn fail_fast_returns_the_first_failure() {
    init_tracing();

    let fail_fast: Vec<(&str, Box<dyn Executor>)> = vec![
        ("sync", Box::new(SyncExecutor::new().with_fail_fast(true)) as Box<dyn Executor>),
        ("threaded", Box::new(ThreadedExecutor::new(2).with_fail_fast(true)) as Box<dyn Executor>),
    ];

    for (name, executor) in fail_fast {
        match executor.execute(&failing_graph(), &keys(&["out1", "sibling"])) {
            Err(TaskGraphError::TaskExecution(failure)) => {
                assert_eq!(failure.key, "bad", "{name}");
                assert_eq!(failure.chain, vec!["bad"], "{name}");
            }
            other => panic!("{name}: expected TaskExecution, got {other:?}"),
        }
    }
}

#[test]
fn dependents_of_failed_node_never_run() -> TestResult {
    let counter = Arc::new(AtomicUsize::new(0));
    let graph = GraphBuilder::new()
        .task("bad", &failing("boom", "nope"), vec![])
        .task("after", &counting("after", Arc::clone(&counter)), vec![r("bad")])
        .build();

    for (name, executor) in executors() {
        let outcome = executor.execute(&graph, &keys(&["after"]))?;
        assert!(outcome.failure("after").is_some(), "{name}");
    }
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn panicking_callable_is_reported_as_failure() -> TestResult {
    init_tracing();

    let panics = Func::new("panics", |_args: &[Value]| -> anyhow::Result<Value> {
        panic!("callable panicked")
    });
    let graph = GraphBuilder::new()
        .task("p", &panics, vec![])
        .task("downstream", &inc(), vec![r("p")])
        .task("fine", &inc(), vec![lit(0)])
        .build();

    for (name, executor) in executors() {
        let outcome = executor.execute(&graph, &keys(&["downstream", "fine"]))?;

        assert_eq!(outcome.value("fine"), Some(&Value::Int(1)), "{name}");
        let failure = outcome.failure("downstream").ok_or("downstream should have failed")?;
        assert_eq!(failure.key, "p", "{name}");
        assert_eq!(failure.chain, vec!["p", "downstream"], "{name}");
        assert!(failure.to_string().contains("callable panicked"), "{name}: {failure}");
    }
    Ok(())
}

#[test]
fn threaded_executor_clamps_workers() {
    assert_eq!(ThreadedExecutor::new(0).num_workers(), 1);
    assert_eq!(ThreadedExecutor::new(8).num_workers(), 8);
}

#[test]
fn single_worker_still_completes() -> TestResult {
    let values = ThreadedExecutor::new(1)
        .execute(&word_count_graph(), &keys(&["format1", "nwords"]))?
        .into_values()?;
    assert_eq!(values["nwords"], Value::Int(7));
    Ok(())
}

#[test]
fn wide_graph_runs_on_many_workers() -> TestResult {
    let inc = inc();
    let mut builder = GraphBuilder::new();
    let mut parts = Vec::new();
    for i in 0..64 {
        let key = format!("leaf{i:02}");
        builder = builder.task(&key, &inc, vec![lit(i)]);
        parts.push(r(&key));
    }
    let graph = builder.task("sum", &total(), parts).build();

    let values = ThreadedExecutor::new(8)
        .execute(&graph, &keys(&["sum"]))?
        .into_values()?;

    // sum of (i + 1) for i in 0..64
    assert_eq!(values["sum"], Value::Int(64 * 65 / 2));
    Ok(())
}

#[tokio::test]
async fn execute_async_inside_runtime() -> TestResult {
    init_tracing();

    let graph = word_count_graph();
    let executor = ThreadedExecutor::new(3);

    let outcome = with_timeout(executor.execute_async(&graph, &["format1", "count1"])).await?;

    assert_eq!(outcome.value("count1"), Some(&Value::Int(2)));
    assert_eq!(outcome.len(), 2);
    Ok(())
}

#[test]
fn engine_uses_threaded_strategy_from_config() -> TestResult {
    let mut config = EngineConfig::default();
    config.engine.strategy = taskdag::types::Strategy::Threaded;
    config.engine.num_workers = 2;

    let engine = Engine::new(config);
    let values = engine.get(&word_count_graph(), &["nwords"])?.into_values()?;

    assert_eq!(values["nwords"], Value::Int(7));
    Ok(())
}

fn threaded_engine() -> Engine {
    let mut config = EngineConfig::default();
    config.engine.strategy = taskdag::types::Strategy::Threaded;
    config.engine.num_workers = 2;
    Engine::new(config)
}

#[tokio::test(flavor = "multi_thread")]
async fn threaded_engine_runs_inside_multi_thread_runtime() -> TestResult {
    init_tracing();

    let values = threaded_engine()
        .get(&word_count_graph(), &["format1"])?
        .into_values()?;

    assert_eq!(values["format1"], Value::from(WORD_COUNT_RESULT));
    Ok(())
}

#[tokio::test]
async fn threaded_engine_runs_inside_current_thread_runtime() -> TestResult {
    let outcome = threaded_engine().get(&failing_graph(), &["out1", "sibling"])?;

    assert_eq!(outcome.value("sibling"), Some(&Value::Int(42)));
    assert!(outcome.failure("out1").is_some());
    Ok(())
}

#[test]
fn long_chain_runs_through_default_pipeline() -> TestResult {
    init_tracing();

    let graph = inc_chain(300);
    let last = chain_key(299);

    let plain = SyncExecutor::new().execute(&graph, &keys(&[last.as_str()]))?;
    assert_eq!(plain.value(&last), Some(&Value::Int(300)));

    let outcome = get(&graph, &[&last], &EngineConfig::default())?;
    assert_eq!(outcome.value(&last), Some(&Value::Int(300)));

    let mut config = EngineConfig::default();
    config.optimize.fast_functions = vec!["inc".to_string()];
    config.engine.strategy = taskdag::types::Strategy::Threaded;
    let outcome = get(&graph, &[&last], &config)?;
    assert_eq!(outcome.value(&last), Some(&Value::Int(300)));
    Ok(())
}

#[test]
fn memo_table_claims_each_key_once() {
    let memo = Arc::new(MemoTable::new());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let memo = Arc::clone(&memo);
            let barrier = Arc::clone(&barrier);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                barrier.wait();
                if memo.claim("k") {
                    wins.fetch_add(1, Ordering::SeqCst);
                    memo.complete("k", Value::Int(7));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(memo.get("k"), Some(Value::Int(7)));
    assert_eq!(memo.completed(), 1);
    assert!(!memo.claim("k"));
}

#[test]
fn memo_table_failed_keys_have_no_value() {
    let memo = MemoTable::new();
    assert!(memo.claim("x"));
    assert!(memo.is_claimed("x"));
    assert_eq!(memo.get("x"), None);

    memo.fail("x");
    assert_eq!(memo.get("x"), None);
    assert!(!memo.claim("x"));
    assert_eq!(memo.completed(), 0);
}

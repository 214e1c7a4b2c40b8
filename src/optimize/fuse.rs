// src/optimize/fuse.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::Result;
use crate::graph::{Dependencies, Expr, Key, TaskGraph, dependents};
use crate::optimize::{checked_dependencies, output_set};

/// Merge linear chains of single-consumer tasks.
///
/// A producer `a` is folded into its consumer `b` when:
/// - both are tasks,
/// - `b` depends on nothing but `a`, and references it exactly once,
/// - `a` has no consumer other than `b`,
/// - `a` is not a requested output.
///
/// `b` keeps its key and its body becomes `b`'s task with `a`'s task nested
/// where the reference was. A merge whose result would nest deeper than
/// [`MAX_NESTING_DEPTH`](crate::graph::MAX_NESTING_DEPTH) is skipped, so long
/// chains end up as several nodes. The rule is applied until nothing changes, so
/// running the pass twice gives the same graph as running it once.
pub fn fuse<S: AsRef<str>>(
    graph: &TaskGraph,
    outputs: &[S],
    deps: Option<&Dependencies>,
) -> Result<(TaskGraph, Dependencies)> {
    let outputs = output_set(outputs);
    let mut deps = checked_dependencies(graph, deps)?;
    let mut consumers = dependents(&deps);
    let mut nodes: BTreeMap<Key, Expr> = graph
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    let mut merged = 0usize;
    loop {
        let mut changed = false;
        let keys: Vec<Key> = nodes.keys().cloned().collect();

        for consumer in keys {
            let Some(producer) = fusible_producer(&nodes, &deps, &consumers, &outputs, &consumer)
            else {
                continue;
            };

            let (Some(producer_body), Some(consumer_body)) =
                (nodes.get(&producer), nodes.get(&consumer))
            else {
                continue;
            };

            let replacement = BTreeMap::from([(producer.clone(), producer_body.clone())]);
            let fused = consumer_body.substitute(&replacement);
            if !fused.within_nesting_limit() {
                debug!(producer = %producer, consumer = %consumer, "fuse: merge would nest too deep; skipped");
                continue;
            }
            nodes.remove(&producer);
            nodes.insert(consumer.clone(), fused);

            // The consumer now uses whatever the producer used.
            let inherited = deps.remove(&producer).unwrap_or_default();
            for dep in &inherited {
                if let Some(users) = consumers.get_mut(dep) {
                    users.remove(&producer);
                    users.insert(consumer.clone());
                }
            }
            consumers.remove(&producer);
            deps.insert(consumer.clone(), inherited);

            debug!(producer = %producer, consumer = %consumer, "fuse: merged producer into consumer");
            merged += 1;
            changed = true;
        }

        if !changed {
            break;
        }
    }

    debug!(
        before = graph.len(),
        after = nodes.len(),
        merged,
        "fuse: merged linear task chains"
    );

    Ok((nodes.into_iter().collect(), deps))
}

/// The producer `consumer` could absorb, if any.
fn fusible_producer(
    nodes: &BTreeMap<Key, Expr>,
    deps: &Dependencies,
    consumers: &BTreeMap<Key, BTreeSet<Key>>,
    outputs: &BTreeSet<Key>,
    consumer: &str,
) -> Option<Key> {
    let body = nodes.get(consumer)?;
    if !body.is_task() {
        return None;
    }

    let uses = deps.get(consumer)?;
    if uses.len() != 1 {
        return None;
    }
    let producer = uses.iter().next()?;

    if producer == consumer || outputs.contains(producer) {
        return None;
    }
    if !nodes.get(producer)?.is_task() {
        return None;
    }
    if consumers.get(producer)?.len() != 1 {
        return None;
    }
    // Substituting a producer referenced twice would compute it twice.
    if count_references(body, producer) != 1 {
        return None;
    }

    Some(producer.clone())
}

fn count_references(expr: &Expr, key: &str) -> usize {
    match expr {
        Expr::Ref(k) => usize::from(k == key),
        Expr::Literal(_) => 0,
        Expr::Task(task) => task.args.iter().map(|a| count_references(a, key)).sum(),
        Expr::List(items) => items.iter().map(|i| count_references(i, key)).sum(),
    }
}

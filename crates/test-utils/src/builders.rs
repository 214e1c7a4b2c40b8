#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, bail};
use taskdag::graph::{Expr, Func, Key, TaskGraph, Value};

/// Builder for `TaskGraph` to simplify test setup.
pub struct GraphBuilder {
    graph: TaskGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: TaskGraph::new(),
        }
    }

    pub fn literal(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.graph.insert(key, Expr::literal(value));
        self
    }

    pub fn alias(mut self, key: &str, target: &str) -> Self {
        self.graph.insert(key, Expr::reference(target));
        self
    }

    pub fn task(mut self, key: &str, func: &Func, args: Vec<Expr>) -> Self {
        self.graph.insert(key, Expr::task(func.clone(), args));
        self
    }

    pub fn node(mut self, key: &str, body: Expr) -> Self {
        self.graph.insert(key, body);
        self
    }

    pub fn build(self) -> TaskGraph {
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a reference argument.
pub fn r(key: &str) -> Expr {
    Expr::reference(key)
}

/// Shorthand for a literal argument.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::literal(value)
}

pub fn keys(names: &[&str]) -> Vec<Key> {
    names.iter().map(|s| s.to_string()).collect()
}

/// `inc(x) = x + 1`, integers only.
pub fn inc() -> Func {
    Func::new("inc", |args: &[Value]| match args {
        [Value::Int(x)] => Ok(Value::Int(x + 1)),
        other => bail!("inc expects one int, got {other:?}"),
    })
}

/// `add(a, b)`, integers only.
pub fn add() -> Func {
    Func::new("add", |args: &[Value]| match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a + b)),
        other => bail!("add expects two ints, got {other:?}"),
    })
}

/// Sum of any number of integer arguments.
pub fn total() -> Func {
    Func::new("total", |args: &[Value]| {
        args.iter()
            .map(|v| v.as_int().ok_or_else(|| anyhow!("total expects ints")))
            .sum::<anyhow::Result<i64>>()
            .map(Value::Int)
    })
}

/// A callable returning its single argument, counting every invocation.
pub fn counting(name: &str, counter: Arc<AtomicUsize>) -> Func {
    Func::new(name.to_string(), move |args: &[Value]| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(args.first().cloned().unwrap_or_default())
    })
}

/// A callable that always fails with `message`.
pub fn failing(name: &str, message: &'static str) -> Func {
    Func::new(name.to_string(), move |_args: &[Value]| Err(anyhow!(message)))
}

pub fn split() -> Func {
    Func::new("split", |args: &[Value]| match args {
        [Value::Str(s)] => Ok(Value::from(s.split_whitespace().collect::<Vec<_>>())),
        other => bail!("split expects one str, got {other:?}"),
    })
}

pub fn len() -> Func {
    Func::new("len", |args: &[Value]| match args {
        [Value::List(items)] => Ok(Value::from(items.len())),
        [Value::Str(s)] => Ok(Value::from(s.chars().count())),
        other => bail!("len expects a list or str, got {other:?}"),
    })
}

pub fn count() -> Func {
    Func::new("count", |args: &[Value]| match args {
        [Value::Str(haystack), Value::Str(needle)] => {
            Ok(Value::from(haystack.matches(needle.as_str()).count()))
        }
        other => bail!("count expects two strs, got {other:?}"),
    })
}

pub fn format_str() -> Func {
    Func::new("format_str", |args: &[Value]| match args {
        [count, val, nwords] => Ok(Value::Str(format!(
            "word list has {count} occurrences of {val}, out of {nwords} words"
        ))),
        other => bail!("format_str expects three arguments, got {other:?}"),
    })
}

/// The word-count graph from the tutorial:
///
/// ```text
/// words   = "apple orange apple pear orange pear pear"
/// nwords  = len(split(words))
/// count1  = count(words, "orange")
/// format1 = format_str(count1, "orange", nwords)
/// ```
pub fn word_count_graph() -> TaskGraph {
    GraphBuilder::new()
        .literal("words", "apple orange apple pear orange pear pear")
        .task("nwords", &len(), vec![Expr::task(split(), vec![r("words")])])
        .task("count1", &count(), vec![r("words"), lit("orange")])
        .task(
            "format1",
            &format_str(),
            vec![r("count1"), lit("orange"), r("nwords")],
        )
        .build()
}

pub const WORD_COUNT_RESULT: &str = "word list has 2 occurrences of orange, out of 7 words";

/// Key of the `i`-th node of [`inc_chain`].
pub fn chain_key(i: usize) -> String {
    format!("t{i:04}")
}

/// A linear chain of `len` single-consumer tasks:
/// `t0000 = inc(0)`, `t0001 = inc(t0000)`, ... so the last node is `len`.
pub fn inc_chain(len: usize) -> TaskGraph {
    let inc = inc();
    let mut builder = GraphBuilder::new().task(&chain_key(0), &inc, vec![lit(0)]);
    for i in 1..len {
        builder = builder.task(&chain_key(i), &inc, vec![r(&chain_key(i - 1))]);
    }
    builder.build()
}

// src/graph/expr.rs

//! Node bodies: literals, references, tasks and nested argument lists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context};

use crate::errors::{Result, TaskGraphError};
use crate::graph::{Key, Value};

/// Maximum nesting of tasks/lists inside one node body.
///
/// Anything deeper is treated as a malformed (most likely self-referential)
/// structure.
pub const MAX_NESTING_DEPTH: usize = 256;

type Callable = dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync;

/// A named callable that can be invoked with positional arguments.
///
/// The name identifies the function for the inline-functions allow-list and
/// in diagnostics, so two different callables should not share a name.
#[derive(Clone)]
pub struct Func {
    name: Arc<str>,
    f: Arc<Callable>,
}

impl Func {
    pub fn new<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> anyhow::Result<Value> {
        (self.f)(args)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Func").field(&self.name).finish()
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && std::ptr::addr_eq(Arc::as_ptr(&self.f), Arc::as_ptr(&other.f))
    }
}

/// A callable applied to an ordered list of argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub func: Func,
    pub args: Vec<Expr>,
}

impl Task {
    pub fn new(func: Func, args: Vec<Expr>) -> Self {
        Self { func, args }
    }
}

/// Body of a graph node, or one argument of a task.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Reference to another node. At the top level of a node this is an alias.
    Ref(Key),
    Task(Task),
    List(Vec<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn reference(key: impl Into<Key>) -> Self {
        Expr::Ref(key.into())
    }

    pub fn task(func: Func, args: Vec<Expr>) -> Self {
        Expr::Task(Task::new(func, args))
    }

    pub fn is_task(&self) -> bool {
        matches!(self, Expr::Task(_))
    }

    /// Keys referenced anywhere inside this expression.
    pub fn dependencies(&self) -> Result<BTreeSet<Key>> {
        let mut out = BTreeSet::new();
        self.collect_dependencies(&mut out, 0)?;
        Ok(out)
    }

    fn collect_dependencies(&self, out: &mut BTreeSet<Key>, depth: usize) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(TaskGraphError::MalformedGraph(format!(
                "expression nesting exceeds {MAX_NESTING_DEPTH} levels"
            )));
        }
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(key) => {
                out.insert(key.clone());
            }
            Expr::Task(task) => {
                for arg in &task.args {
                    arg.collect_dependencies(out, depth + 1)?;
                }
            }
            Expr::List(items) => {
                for item in items {
                    item.collect_dependencies(out, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Whether this expression nests no deeper than [`MAX_NESTING_DEPTH`].
    ///
    /// Rewriting passes check this before nesting one body inside another.
    pub fn within_nesting_limit(&self) -> bool {
        self.fits_depth(0)
    }

    fn fits_depth(&self, depth: usize) -> bool {
        if depth > MAX_NESTING_DEPTH {
            return false;
        }
        match self {
            Expr::Literal(_) | Expr::Ref(_) => true,
            Expr::Task(task) => task.args.iter().all(|a| a.fits_depth(depth + 1)),
            Expr::List(items) => items.iter().all(|i| i.fits_depth(depth + 1)),
        }
    }

    /// Names of every callable used inside this expression.
    pub fn functions(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_functions(&mut out);
        out
    }

    fn collect_functions<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) | Expr::Ref(_) => {}
            Expr::Task(task) => {
                out.insert(task.func.name());
                for arg in &task.args {
                    arg.collect_functions(out);
                }
            }
            Expr::List(items) => {
                for item in items {
                    item.collect_functions(out);
                }
            }
        }
    }

    /// Replace every reference to a key in `replacements` with the mapped
    /// expression. Replacements are not themselves rewritten.
    pub fn substitute(&self, replacements: &BTreeMap<Key, Expr>) -> Expr {
        match self {
            Expr::Ref(key) => match replacements.get(key) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            Expr::Literal(_) => self.clone(),
            Expr::Task(task) => Expr::Task(Task {
                func: task.func.clone(),
                args: task.args.iter().map(|a| a.substitute(replacements)).collect(),
            }),
            Expr::List(items) => {
                Expr::List(items.iter().map(|i| i.substitute(replacements)).collect())
            }
        }
    }

    /// Evaluate this expression, looking referenced keys up with `resolve`.
    ///
    /// Errors from a callable are returned with the callable's name attached.
    pub fn evaluate<F>(&self, resolve: &F) -> anyhow::Result<Value>
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Ref(key) => {
                resolve(key).ok_or_else(|| anyhow!("reference to '{key}' has no computed value"))
            }
            Expr::Task(task) => {
                let args = task
                    .args
                    .iter()
                    .map(|a| a.evaluate(resolve))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                task.func
                    .call(&args)
                    .with_context(|| format!("calling '{}'", task.func.name()))
            }
            Expr::List(items) => items
                .iter()
                .map(|i| i.evaluate(resolve))
                .collect::<anyhow::Result<Vec<_>>>()
                .map(Value::List),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Str(s)) => write!(f, "{s:?}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Ref(key) => write!(f, "<{key}>"),
            Expr::Task(task) => {
                write!(f, "{}(", task.func.name())?;
                for (i, arg) in task.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

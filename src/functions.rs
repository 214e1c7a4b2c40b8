// src/functions.rs

//! Named callables available to graphs decoded from files.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, ensure};

use crate::graph::{Func, Value};

/// Lookup table from callable name to [`Func`].
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    funcs: BTreeMap<String, Func>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Func::new("len", len));
        registry.register(Func::new("split", split));
        registry.register(Func::new("count", count));
        registry.register(Func::new("format", format));
        registry.register(Func::new("add", add));
        registry.register(Func::new("sum", sum));
        registry.register(Func::new("mul", mul));
        registry.register(Func::new("inc", inc));
        registry.register(Func::new("concat", concat));
        registry.register(Func::new("upper", upper));
        registry.register(Func::new("identity", identity));
        registry
    }

    /// Add or replace a callable under its own name.
    pub fn register(&mut self, func: Func) -> &mut Self {
        self.funcs.insert(func.name().to_string(), func);
        self
    }

    pub fn get(&self, name: &str) -> Option<Func> {
        self.funcs.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> anyhow::Result<()> {
    ensure!(
        args.len() == expected,
        "{name} expects {expected} argument(s), got {}",
        args.len()
    );
    Ok(())
}

fn str_arg<'a>(name: &str, value: &'a Value) -> anyhow::Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| anyhow!("{name} expects a str, got {}", value.type_name()))
}

/// Length of a string (in characters) or a list.
fn len(args: &[Value]) -> anyhow::Result<Value> {
    arity("len", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::from(s.chars().count())),
        Value::List(items) => Ok(Value::from(items.len())),
        other => bail!("len expects a str or list, got {}", other.type_name()),
    }
}

/// Split on whitespace, or on an explicit separator given as second argument.
fn split(args: &[Value]) -> anyhow::Result<Value> {
    ensure!(
        matches!(args.len(), 1 | 2),
        "split expects 1 or 2 arguments, got {}",
        args.len()
    );
    let text = str_arg("split", &args[0])?;
    let parts: Vec<Value> = match args.get(1) {
        Some(sep) => {
            let sep = str_arg("split", sep)?;
            ensure!(!sep.is_empty(), "split separator must not be empty");
            text.split(sep).map(Value::from).collect()
        }
        None => text.split_whitespace().map(Value::from).collect(),
    };
    Ok(Value::List(parts))
}

/// Non-overlapping occurrences of a substring, or equal items in a list.
fn count(args: &[Value]) -> anyhow::Result<Value> {
    arity("count", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Str(haystack), Value::Str(needle)) => {
            ensure!(!needle.is_empty(), "count needle must not be empty");
            Ok(Value::from(haystack.matches(needle.as_str()).count()))
        }
        (Value::List(items), needle) => {
            Ok(Value::from(items.iter().filter(|item| *item == needle).count()))
        }
        (other, _) => bail!("count expects a str or list, got {}", other.type_name()),
    }
}

/// Replace each `{}` in the template (first argument) with the next argument.
fn format(args: &[Value]) -> anyhow::Result<Value> {
    let (template, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("format expects a template argument"))?;
    let template = str_arg("format", template)?;

    let pieces: Vec<&str> = template.split("{}").collect();
    ensure!(
        pieces.len() - 1 == rest.len(),
        "format template has {} placeholder(s) but {} value(s) were given",
        pieces.len() - 1,
        rest.len()
    );

    let mut out = String::with_capacity(template.len());
    for (i, piece) in pieces.iter().enumerate() {
        out.push_str(piece);
        if let Some(value) = rest.get(i) {
            out.push_str(&value.to_string());
        }
    }
    Ok(Value::Str(out))
}

fn numeric_binary(
    name: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> anyhow::Result<Value> {
    arity(name, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| anyhow!("{name} overflowed on {a} and {b}")),
        (a, b) => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Ok(Value::Float(float_op(x, y))),
            _ => bail!(
                "{name} expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ),
        },
    }
}

fn add(args: &[Value]) -> anyhow::Result<Value> {
    numeric_binary("add", args, i64::checked_add, |x, y| x + y)
}

fn mul(args: &[Value]) -> anyhow::Result<Value> {
    numeric_binary("mul", args, i64::checked_mul, |x, y| x * y)
}

fn inc(args: &[Value]) -> anyhow::Result<Value> {
    arity("inc", args, 1)?;
    add(&[args[0].clone(), Value::Int(1)])
}

/// Sum of a list of numbers.
fn sum(args: &[Value]) -> anyhow::Result<Value> {
    arity("sum", args, 1)?;
    let items = args[0]
        .as_list()
        .ok_or_else(|| anyhow!("sum expects a list, got {}", args[0].type_name()))?;
    items
        .iter()
        .try_fold(Value::Int(0), |acc, item| add(&[acc, item.clone()]))
}

/// Join the display form of every argument.
fn concat(args: &[Value]) -> anyhow::Result<Value> {
    Ok(Value::Str(args.iter().map(ToString::to_string).collect()))
}

fn upper(args: &[Value]) -> anyhow::Result<Value> {
    arity("upper", args, 1)?;
    Ok(Value::Str(str_arg("upper", &args[0])?.to_uppercase()))
}

fn identity(args: &[Value]) -> anyhow::Result<Value> {
    arity("identity", args, 1)?;
    Ok(args[0].clone())
}

// src/config/decode.rs

//! Decoding TOML node bodies into [`Expr`]s.
//!
//! - scalars are literals
//! - arrays are argument lists
//! - `{ ref = "key" }` references another node
//! - `{ task = "name", args = [...] }` applies a registered callable
//! - `{ value = ... }` is a literal escape, e.g. for a literal list

use std::collections::BTreeMap;

use crate::errors::{Result, TaskGraphError};
use crate::functions::FunctionRegistry;
use crate::graph::{Expr, MAX_NESTING_DEPTH, TaskGraph, Value, validate_graph};

/// Decode every node of a `[graph]` table and validate the result.
pub fn decode_graph(
    raw: &BTreeMap<String, toml::Value>,
    registry: &FunctionRegistry,
) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();
    for (key, body) in raw {
        let expr = decode_expr(body, registry, 0).map_err(|e| match e {
            TaskGraphError::MalformedGraph(msg) => {
                TaskGraphError::MalformedGraph(format!("node '{key}': {msg}"))
            }
            other => other,
        })?;
        graph.insert(key.clone(), expr);
    }

    validate_graph(&graph)?;
    Ok(graph)
}

/// Decode one TOML value into an expression.
pub fn decode_expr(value: &toml::Value, registry: &FunctionRegistry, depth: usize) -> Result<Expr> {
    if depth > MAX_NESTING_DEPTH {
        return Err(malformed(format!(
            "expression nesting exceeds {MAX_NESTING_DEPTH} levels"
        )));
    }

    match value {
        toml::Value::Array(items) => items
            .iter()
            .map(|item| decode_expr(item, registry, depth + 1))
            .collect::<Result<Vec<_>>>()
            .map(Expr::List),
        toml::Value::Table(table) => decode_table(table, registry, depth),
        scalar => Ok(Expr::Literal(decode_literal(scalar, depth)?)),
    }
}

fn decode_table(table: &toml::Table, registry: &FunctionRegistry, depth: usize) -> Result<Expr> {
    if let Some(target) = table.get("ref") {
        ensure_only_keys(table, &["ref"])?;
        let key = target
            .as_str()
            .ok_or_else(|| malformed(format!("`ref` must be a string, got {target}")))?;
        return Ok(Expr::Ref(key.to_string()));
    }

    if let Some(head) = table.get("task") {
        ensure_only_keys(table, &["task", "args"])?;
        let name = head
            .as_str()
            .ok_or_else(|| malformed(format!("task head {head} is not callable")))?;
        let func = registry
            .get(name)
            .ok_or_else(|| malformed(format!("task head '{name}' is not a registered callable")))?;

        let args = match table.get("args") {
            None => Vec::new(),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|item| decode_expr(item, registry, depth + 1))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(malformed(format!("`args` must be an array, got {other}")));
            }
        };
        return Ok(Expr::task(func, args));
    }

    if let Some(value) = table.get("value") {
        ensure_only_keys(table, &["value"])?;
        return Ok(Expr::Literal(decode_literal(value, depth)?));
    }

    Err(malformed(
        "table must contain one of `ref`, `task` or `value`".to_string(),
    ))
}

/// Plain data: arrays become `Value::List`, tables are rejected.
fn decode_literal(value: &toml::Value, depth: usize) -> Result<Value> {
    if depth > MAX_NESTING_DEPTH {
        return Err(malformed(format!(
            "literal nesting exceeds {MAX_NESTING_DEPTH} levels"
        )));
    }

    match value {
        toml::Value::String(s) => Ok(Value::Str(s.clone())),
        toml::Value::Integer(i) => Ok(Value::Int(*i)),
        toml::Value::Float(f) => Ok(Value::Float(*f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        toml::Value::Datetime(dt) => Ok(Value::Str(dt.to_string())),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| decode_literal(item, depth + 1))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        toml::Value::Table(_) => Err(malformed(
            "tables are not allowed inside a literal `value`".to_string(),
        )),
    }
}

fn ensure_only_keys(table: &toml::Table, allowed: &[&str]) -> Result<()> {
    match table.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(extra) => Err(malformed(format!("unexpected field `{extra}`"))),
        None => Ok(()),
    }
}

fn malformed(msg: String) -> TaskGraphError {
    TaskGraphError::MalformedGraph(msg)
}

// src/graph/mod.rs

//! Task graph representation.
//!
//! - [`value`] holds the dynamic [`Value`] type passed between nodes.
//! - [`expr`] defines node bodies ([`Expr`]), tasks and callables.
//! - [`task_graph`] holds the key -> body mapping and dependency helpers.
//! - [`validate`] checks references and acyclicity.

pub mod expr;
pub mod task_graph;
pub mod validate;
pub mod value;

/// Canonical node key type used throughout the engine.
pub type Key = String;

pub use expr::{Expr, Func, MAX_NESTING_DEPTH, Task};
pub use task_graph::{Dependencies, Dependents, TaskGraph, dependents};
pub use validate::{check_references, topological_order, validate_graph};
pub use value::Value;

// src/optimize/mod.rs

//! Graph optimization passes.
//!
//! Every pass takes the graph by reference and returns a new graph; the
//! input is never modified. Passes that accept a dependency mapping compute
//! it themselves when given `None`.
//!
//! - [`cull`] drops nodes not needed for the requested outputs.
//! - [`inline`] substitutes literal and alias nodes into their consumers.
//! - [`inline_functions`] substitutes tasks built from allow-listed callables.
//! - [`fuse`] merges linear chains of single-consumer tasks.

pub mod cull;
pub mod fuse;
pub mod inline;
pub mod inline_functions;

use std::collections::BTreeSet;

use crate::errors::Result;
use crate::graph::{Dependencies, Key, TaskGraph, check_references, topological_order};

pub use cull::cull;
pub use fuse::fuse;
pub use inline::inline;
pub use inline_functions::{FastFunctions, inline_functions};

/// Collect requested output keys into an ordered set.
pub fn output_set<S: AsRef<str>>(outputs: &[S]) -> BTreeSet<Key> {
    outputs.iter().map(|s| s.as_ref().to_string()).collect()
}

/// Shared preamble of the rewriting passes: obtain a fresh dependency
/// mapping and make sure the input satisfies the graph invariants.
fn checked_dependencies(graph: &TaskGraph, deps: Option<&Dependencies>) -> Result<Dependencies> {
    let deps = match deps {
        Some(d) => d.clone(),
        None => graph.dependencies()?,
    };
    check_references(graph, &deps)?;
    topological_order(&deps)?;
    Ok(deps)
}

// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::graph::TaskGraph;
use crate::types::Strategy;

/// Engine configuration as read from TOML, before validation.
///
/// ```toml
/// [engine]
/// strategy = "threaded"
/// num_workers = 4
/// fail_fast = false
///
/// [optimize]
/// fuse = true
/// fast_functions = ["len", "split"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub optimize: OptimizeSection,
}

/// Validated engine configuration.
///
/// Obtain one through `EngineConfig::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate); the default value
/// is always valid.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub optimize: OptimizeSection,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(engine: EngineSection, optimize: OptimizeSection) -> Self {
        Self { engine, optimize }
    }

    /// Back to the raw form, e.g. to apply overrides and validate again.
    pub fn into_raw(self) -> RawEngineConfig {
        RawEngineConfig {
            engine: self.engine,
            optimize: self.optimize,
        }
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// `"sync"` (default) or `"threaded"`.
    #[serde(default)]
    pub strategy: Strategy,

    /// Maximum number of nodes evaluated at once by the threaded strategy.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Abort at the first failing callable instead of reporting failures
    /// per output.
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_num_workers() -> usize {
    4
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            num_workers: default_num_workers(),
            fail_fast: false,
        }
    }
}

/// `[optimize]` section: which passes run before execution.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeSection {
    #[serde(default = "enabled")]
    pub cull: bool,

    #[serde(default = "enabled")]
    pub inline: bool,

    #[serde(default = "enabled")]
    pub inline_functions: bool,

    #[serde(default = "enabled")]
    pub fuse: bool,

    /// Names of callables cheap enough to be recomputed in every consumer.
    ///
    /// Empty by default: nothing is considered cheap unless listed.
    #[serde(default)]
    pub fast_functions: Vec<String>,
}

fn enabled() -> bool {
    true
}

impl OptimizeSection {
    /// All passes off: execute the graph exactly as given.
    pub fn disabled() -> Self {
        Self {
            cull: false,
            inline: false,
            inline_functions: false,
            fuse: false,
            fast_functions: Vec::new(),
        }
    }
}

impl Default for OptimizeSection {
    fn default() -> Self {
        Self {
            cull: true,
            inline: true,
            inline_functions: true,
            fuse: true,
            fast_functions: Vec::new(),
        }
    }
}

/// Graph file as read from TOML.
///
/// ```toml
/// outputs = ["format1"]
///
/// [graph]
/// words = "apple orange apple pear orange pear pear"
/// count1 = { task = "count", args = [{ ref = "words" }, "orange"] }
/// ```
///
/// Node bodies are kept as raw TOML values here; they are decoded against a
/// [`FunctionRegistry`](crate::functions::FunctionRegistry) by
/// [`GraphFile::decode`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGraphFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub optimize: OptimizeSection,

    /// Keys to compute when the caller does not name any.
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub graph: BTreeMap<String, toml::Value>,
}

/// A decoded graph file.
///
/// The engine settings are kept raw so callers can apply overrides (e.g.
/// from the command line) before validating them.
#[derive(Debug, Clone)]
pub struct GraphFile {
    pub config: RawEngineConfig,
    pub outputs: Vec<String>,
    pub graph: TaskGraph,
}

// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::decode::decode_graph;
use crate::config::model::{EngineConfig, GraphFile, RawEngineConfig, RawGraphFile};
use crate::errors::Result;
use crate::functions::FunctionRegistry;

/// Load an engine configuration file and return the raw `RawEngineConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawEngineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load an engine configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = EngineConfig::try_from(raw_config)?;
    Ok(config)
}

/// Parse a graph file from a string, resolving task heads in `registry`.
pub fn parse_graph_file(contents: &str, registry: &FunctionRegistry) -> Result<GraphFile> {
    let raw: RawGraphFile = toml::from_str(contents)?;
    GraphFile::decode(raw, registry)
}

/// Load a graph file (graph + outputs + optional engine settings) from disk.
pub fn load_graph_file(path: impl AsRef<Path>, registry: &FunctionRegistry) -> Result<GraphFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_graph_file(&contents, registry)
}

impl GraphFile {
    pub fn decode(raw: RawGraphFile, registry: &FunctionRegistry) -> Result<Self> {
        let graph = decode_graph(&raw.graph, registry)?;
        Ok(Self {
            config: RawEngineConfig {
                engine: raw.engine,
                optimize: raw.optimize,
            },
            outputs: raw.outputs,
            graph,
        })
    }
}

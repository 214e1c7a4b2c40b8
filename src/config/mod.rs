// src/config/mod.rs

//! Configuration and graph-file loading for taskdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load engine configs and graph files from disk (`loader.rs`).
//! - Validate engine settings (`validate.rs`).
//! - Decode TOML node bodies into expressions (`decode.rs`).

pub mod decode;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_graph_file, parse_graph_file};
pub use model::{
    EngineConfig, EngineSection, GraphFile, OptimizeSection, RawEngineConfig, RawGraphFile,
};

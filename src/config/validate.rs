// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{Result, TaskGraphError};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = TaskGraphError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(raw.engine, raw.optimize))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    validate_engine_section(cfg)?;
    validate_fast_functions(cfg)?;
    Ok(())
}

fn validate_engine_section(cfg: &RawEngineConfig) -> Result<()> {
    // strategy is strongly typed and validated during deserialization.

    if cfg.engine.num_workers == 0 {
        return Err(TaskGraphError::ConfigError(
            "[engine].num_workers must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_fast_functions(cfg: &RawEngineConfig) -> Result<()> {
    for name in cfg.optimize.fast_functions.iter() {
        if name.trim().is_empty() {
            return Err(TaskGraphError::ConfigError(
                "[optimize].fast_functions must not contain empty names".to_string(),
            ));
        }
    }

    if !cfg.optimize.fast_functions.is_empty() && !cfg.optimize.inline_functions {
        tracing::warn!(
            fast_functions = ?cfg.optimize.fast_functions,
            "fast_functions given but inline_functions pass is disabled; list will be ignored"
        );
    }

    Ok(())
}

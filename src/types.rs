use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which executor evaluates the optimized graph.
///
/// - `Sync`: evaluate nodes one by one on the calling thread (default).
/// - `Threaded`: dispatch ready nodes to a bounded worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Sync,
    Threaded,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(Strategy::Sync),
            "threaded" | "threads" => Ok(Strategy::Threaded),
            other => Err(format!(
                "invalid strategy: {other} (expected \"sync\" or \"threaded\")"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Sync => f.write_str("sync"),
            Strategy::Threaded => f.write_str("threaded"),
        }
    }
}

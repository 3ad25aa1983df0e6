//! Configuration management for the graph builder.
//!
//! Supports loading from environment variables, config files, and CLI arguments.
//! Later sources override earlier ones: defaults, then the TOML file, then the
//! environment, then the command line.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregate_graph::EdgeMode;
use crate::error::GraphError;
use crate::filter::FilterPolicy;
use crate::write_graph::DEFAULT_VALUE_PRECISION;

pub const ENV_MODE: &str = "TOKEN_GRAPH_MODE";
pub const ENV_EXCLUDE_SELF_TRANSFERS: &str = "TOKEN_GRAPH_EXCLUDE_SELF_TRANSFERS";
pub const ENV_EXCLUDE_ZERO_ADDRESS: &str = "TOKEN_GRAPH_EXCLUDE_ZERO_ADDRESS";
pub const ENV_CONTRACT_ID: &str = "TOKEN_GRAPH_CONTRACT_ID";
pub const ENV_VALUE_PRECISION: &str = "TOKEN_GRAPH_VALUE_PRECISION";

/// Largest precision that still changes the printed value of an f64
const MAX_VALUE_PRECISION: usize = 17;

/// Main builder configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Which transfers become edges
    #[serde(default)]
    pub policy: FilterPolicy,

    /// Raw or aggregated edge list
    #[serde(default)]
    pub mode: EdgeMode,

    /// Output formatting
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Fractional digits for values and strengths
    #[serde(default = "default_value_precision")]
    pub value_precision: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            value_precision: default_value_precision(),
        }
    }
}

fn default_value_precision() -> usize {
    DEFAULT_VALUE_PRECISION
}

impl BuildConfig {
    /// Load configuration from defaults and environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML config file with environment overrides
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GraphError::io(format!("reading {}", path.display()), e))?;
        let mut config: Self =
            ::toml::from_str(&contents).map_err(|e| GraphError::Config(e.to_string()))?;

        // Environment variables override file settings
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TOKEN_GRAPH_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), GraphError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE) {
            self.mode = mode
                .parse()
                .map_err(|e: String| GraphError::Config(format!("{ENV_MODE}: {e}")))?;
        }
        if let Some(value) = lookup(ENV_EXCLUDE_SELF_TRANSFERS) {
            self.policy.exclude_self_transfers = parse_env(ENV_EXCLUDE_SELF_TRANSFERS, &value)?;
        }
        if let Some(value) = lookup(ENV_EXCLUDE_ZERO_ADDRESS) {
            self.policy.exclude_zero_address = parse_env(ENV_EXCLUDE_ZERO_ADDRESS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONTRACT_ID) {
            self.policy.contract_id = if value.trim().is_empty() {
                None
            } else {
                Some(parse_env(ENV_CONTRACT_ID, &value)?)
            };
        }
        if let Some(value) = lookup(ENV_VALUE_PRECISION) {
            self.output.value_precision = parse_env(ENV_VALUE_PRECISION, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.output.value_precision > MAX_VALUE_PRECISION {
            return Err(GraphError::Config(format!(
                "value_precision must be <= {}, got {}",
                MAX_VALUE_PRECISION, self.output.value_precision
            )));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, GraphError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GraphError::Config(format!("{key}={value:?}: {e}")))
}

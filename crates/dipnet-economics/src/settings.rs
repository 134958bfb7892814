/// ENGINE CONFIGURATION
///
/// Layered: built-in defaults, then an optional TOML/JSON file, then
/// environment variables (`DIPNET_MAX_DEPTH`, `DIPNET_ROUNDING`,
/// `DIPNET_GENERATION_RATES_BPS=300,250,...`).

use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use dipnet_core::MAX_GENERATIONS;

use crate::calculator::{CommissionCalculator, RoundingMode};
use crate::rates::{
    RateTable, RateTableError, DEFAULT_GENERATION_RATES_BPS, DEFAULT_STOCKIST_RATE_BPS,
};

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "DIPNET";

/// Upper bound on a configured walk depth
pub const MAX_CONFIGURABLE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generations walked above a sale's sponsor
    pub max_depth: usize,
    pub rounding: RoundingMode,
    pub stockist_rate_bps: u32,
    pub generation_rates_bps: Vec<u32>,
    /// Display currency code
    pub currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_depth: MAX_GENERATIONS,
            rounding: RoundingMode::HalfUp,
            stockist_rate_bps: DEFAULT_STOCKIST_RATE_BPS,
            generation_rates_bps: DEFAULT_GENERATION_RATES_BPS.to_vec(),
            currency: "UGX".to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults, optional file, `DIPNET_*` environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("generation_rates_bps"),
        );

        let loaded: EngineConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        loaded.validate()?;

        info!(
            "Engine config: depth {}, rounding {:?}, {} generations, {} bps total",
            loaded.max_depth,
            loaded.rounding,
            loaded.generation_rates_bps.len(),
            loaded.rate_table()?.total_rate_bps()
        );
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > MAX_CONFIGURABLE_DEPTH {
            return Err(ConfigError::InvalidDepth(self.max_depth));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Load("currency must not be empty".to_string()));
        }
        self.rate_table()?;
        Ok(())
    }

    pub fn rate_table(&self) -> Result<RateTable, ConfigError> {
        Ok(RateTable::with_max_generations(
            self.stockist_rate_bps,
            self.generation_rates_bps.clone(),
            self.max_depth,
        )?)
    }

    pub fn calculator(&self) -> Result<CommissionCalculator, ConfigError> {
        Ok(CommissionCalculator::new(self.rate_table()?, self.rounding))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to load config: {0}")]
    Load(String),
    #[error("max_depth must be between 1 and 64, got {0}")]
    InvalidDepth(usize),
    #[error("Invalid rate table: {0}")]
    Rates(#[from] RateTableError),
}

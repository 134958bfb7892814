/// COMMISSION RATE TABLE
///
/// Rates are held in basis points (1 bp = 0.01%) so every leg is computed
/// with integer arithmetic. The default table pays the stockist 8% and ten
/// network generations 12.5% between them, 20.5% of the price in total.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dipnet_core::MAX_GENERATIONS;

/// Basis points in 100%
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Stockist share: 8%
pub const DEFAULT_STOCKIST_RATE_BPS: u32 = 800;

/// Generation shares Gn1..Gn10: 3, 2.5, 2, 1.5, 1, 0.8, 0.6, 0.5, 0.4, 0.2 %
pub const DEFAULT_GENERATION_RATES_BPS: [u32; MAX_GENERATIONS] =
    [300, 250, 200, 150, 100, 80, 60, 50, 40, 20];

/// Who a tier pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    Stockist,
    /// 1-based network generation
    Generation(u8),
}

/// One (level, rate) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub level: TierLevel,
    pub rate_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    stockist_rate_bps: u32,
    generation_rates_bps: Vec<u32>,
}

impl Default for RateTable {
    fn default() -> Self {
        RateTable {
            stockist_rate_bps: DEFAULT_STOCKIST_RATE_BPS,
            generation_rates_bps: DEFAULT_GENERATION_RATES_BPS.to_vec(),
        }
    }
}

impl RateTable {
    /// Build and validate a table against the default generation bound
    pub fn new(stockist_rate_bps: u32, generation_rates_bps: Vec<u32>) -> Result<Self, RateTableError> {
        Self::with_max_generations(stockist_rate_bps, generation_rates_bps, MAX_GENERATIONS)
    }

    pub fn with_max_generations(
        stockist_rate_bps: u32,
        generation_rates_bps: Vec<u32>,
        max_generations: usize,
    ) -> Result<Self, RateTableError> {
        let table = RateTable {
            stockist_rate_bps,
            generation_rates_bps,
        };
        table.validate(max_generations)?;
        Ok(table)
    }

    pub fn validate(&self, max_generations: usize) -> Result<(), RateTableError> {
        if self.generation_rates_bps.len() > max_generations {
            return Err(RateTableError::TooManyGenerations {
                levels: self.generation_rates_bps.len(),
                max: max_generations,
            });
        }
        if self.generation_rates_bps.len() > u8::MAX as usize {
            return Err(RateTableError::TooManyGenerations {
                levels: self.generation_rates_bps.len(),
                max: u8::MAX as usize,
            });
        }

        for tier in self.tiers() {
            if tier.rate_bps > BPS_DENOMINATOR {
                return Err(RateTableError::RateOutOfRange(tier.level, tier.rate_bps));
            }
        }

        let total = self.total_rate_bps();
        if total > BPS_DENOMINATOR as u64 {
            return Err(RateTableError::TotalExceedsPrice(total));
        }
        Ok(())
    }

    pub fn stockist_rate_bps(&self) -> u32 {
        self.stockist_rate_bps
    }

    pub fn generation_rates_bps(&self) -> &[u32] {
        &self.generation_rates_bps
    }

    /// Rate for a 1-based generation; generations beyond the table pay nothing
    pub fn generation_rate_bps(&self, generation: usize) -> u32 {
        generation
            .checked_sub(1)
            .and_then(|i| self.generation_rates_bps.get(i))
            .copied()
            .unwrap_or(0)
    }

    pub fn generations(&self) -> usize {
        self.generation_rates_bps.len()
    }

    /// Sum of every tier, in basis points
    pub fn total_rate_bps(&self) -> u64 {
        self.tiers().map(|t| t.rate_bps as u64).sum()
    }

    /// Stockist tier followed by generations in order
    pub fn tiers(&self) -> impl Iterator<Item = CommissionTier> + '_ {
        std::iter::once(CommissionTier {
            level: TierLevel::Stockist,
            rate_bps: self.stockist_rate_bps,
        })
        .chain(
            self.generation_rates_bps
                .iter()
                .enumerate()
                .map(|(i, &rate_bps)| CommissionTier {
                    level: TierLevel::Generation((i + 1) as u8),
                    rate_bps,
                }),
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RateTableError {
    #[error("Rate table has {levels} generations, at most {max} allowed")]
    TooManyGenerations { levels: usize, max: usize },
    #[error("Rate for {0:?} out of range: {1} bps")]
    RateOutOfRange(TierLevel, u32),
    #[error("Rates sum to {0} bps, more than the sale price")]
    TotalExceedsPrice(u64),
}

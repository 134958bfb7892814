/// DIPNET NETWORK ECONOMICS
///
/// This crate implements the commission layer of the sponsor network:
/// - A bounded rate table (stockist share plus ten network generations)
/// - A pure calculator splitting each sale into legs and a company balance
/// - An optional ledger freezing breakdowns at sale time
/// - Per-member payout statements
/// - Layered engine configuration

pub mod rates;
pub mod calculator;
pub mod ledger;
pub mod payout;
pub mod settings;

// Re-export key types for easy access
pub use rates::{
    CommissionTier, RateTable, RateTableError, TierLevel, BPS_DENOMINATOR,
    DEFAULT_GENERATION_RATES_BPS, DEFAULT_STOCKIST_RATE_BPS,
};

pub use calculator::{
    Beneficiary, CalculationError, CommissionBreakdown, CommissionCalculator, LevelCommission,
    RoundingMode,
};

pub use ledger::{CommissionLedger, LedgerEntry, LedgerError, LegDrift, SharedLedger};

pub use payout::{MemberEarnings, PayoutStatement};

pub use settings::{ConfigError, EngineConfig};

/// Economic system integrator (combines all modules)
pub mod integration {
    use crate::*;
    use dipnet_core::{BusinessId, MemberRegistry, OrderedItem, RegistryError};
    use log::info;

    #[derive(Debug, Clone)]
    pub struct DipnetEconomics {
        /// Validated engine configuration
        pub config: EngineConfig,
        /// Calculator built from `config`
        pub calculator: CommissionCalculator,
        /// Sponsor hierarchy
        pub registry: MemberRegistry,
        /// Frozen breakdowns
        pub ledger: CommissionLedger,
    }

    impl DipnetEconomics {
        /// Default rate table over an empty registry
        pub fn genesis() -> Self {
            DipnetEconomics {
                config: EngineConfig::default(),
                calculator: CommissionCalculator::default(),
                registry: MemberRegistry::new(),
                ledger: CommissionLedger::new(),
            }
        }

        pub fn new(config: EngineConfig, registry: MemberRegistry) -> Result<Self, EconomicError> {
            config.validate()?;
            let calculator = config.calculator()?;
            info!("Economics ready over {} members", registry.len());
            Ok(DipnetEconomics {
                config,
                calculator,
                registry,
                ledger: CommissionLedger::new(),
            })
        }

        /// Read-time projection of a sale against the current hierarchy
        pub fn breakdown(&self, sale: &OrderedItem) -> Result<CommissionBreakdown, EconomicError> {
            Ok(self
                .calculator
                .compute_for_sale(sale, &self.registry, self.config.max_depth)?)
        }

        /// Compute and freeze a sale's breakdown
        pub fn record_sale(&mut self, sale: &OrderedItem) -> Result<LedgerEntry, EconomicError> {
            let breakdown = self.breakdown(sale)?;
            Ok(self.ledger.record(breakdown)?.clone())
        }

        /// Legs where today's projection differs from the recorded entry
        pub fn drift(&self, sale: &OrderedItem) -> Result<Vec<LegDrift>, EconomicError> {
            let current = self.breakdown(sale)?;
            Ok(self.ledger.drift(sale.id, &current)?)
        }

        /// Statement over read-time projections of the given sales
        pub fn statement<'a, I>(&self, sales: I) -> Result<PayoutStatement, EconomicError>
        where
            I: IntoIterator<Item = &'a OrderedItem>,
        {
            let mut statement = PayoutStatement::default();
            for sale in sales {
                statement.add(&self.breakdown(sale)?);
            }
            Ok(statement)
        }

        /// Statement over recorded ledger entries only
        pub fn recorded_statement(&self) -> PayoutStatement {
            PayoutStatement::from_breakdowns(self.ledger.entries().map(|e| &e.breakdown))
        }

        pub fn reassign_sponsor(
            &mut self,
            member: &BusinessId,
            new_sponsor: Option<BusinessId>,
        ) -> Result<Option<BusinessId>, EconomicError> {
            Ok(self.registry.reassign_sponsor(member, new_sponsor)?)
        }

        /// Verify configuration and every ledger entry
        pub fn verify_invariants(&self) -> Result<(), EconomicError> {
            self.config.validate()?;
            self.calculator.rate_table().validate(self.config.max_depth)?;
            self.ledger.verify_all()?;

            for entry in self.ledger.entries() {
                entry.breakdown.verify()?;
            }
            Ok(())
        }
    }

    #[derive(Debug, thiserror::Error, Clone, PartialEq)]
    pub enum EconomicError {
        #[error("Rate table error: {0}")]
        Rates(#[from] rates::RateTableError),
        #[error("Calculation error: {0}")]
        Calculation(#[from] calculator::CalculationError),
        #[error("Ledger error: {0}")]
        Ledger(#[from] ledger::LedgerError),
        #[error("Config error: {0}")]
        Config(#[from] settings::ConfigError),
        #[error("Registry error: {0}")]
        Registry(#[from] RegistryError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_creation() {
        let econ = integration::DipnetEconomics::genesis();
        assert!(econ.ledger.is_empty());
        assert_eq!(econ.calculator.rate_table().total_rate_bps(), 2050);
    }

    #[test]
    fn test_genesis_invariants() {
        let econ = integration::DipnetEconomics::genesis();
        assert!(econ.verify_invariants().is_ok());
    }
}

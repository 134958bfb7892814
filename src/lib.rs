/// DIPNET
///
/// Facade over the workspace crates:
/// - `network`: members, sales, the sponsor registry and upline resolution
/// - `economics`: rate table, commission calculator, ledger, payouts, settings
/// - `cli`: dataset loading and reports behind the `dipnet` binary

pub use dipnet_cli as cli;
pub use dipnet_core as network;
pub use dipnet_economics as economics;

pub use dipnet_core::{Amount, BusinessId, Member, MemberRegistry, OrderedItem, Upline};
pub use dipnet_economics::integration::{DipnetEconomics, EconomicError};
pub use dipnet_economics::{CommissionBreakdown, CommissionCalculator, EngineConfig, RateTable};

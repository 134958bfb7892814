/// DIPNET COMMAND LINE
///
/// Dataset loading and the report builders behind the `dipnet` binary.
/// Members and sales are read from JSON arrays; every command produces a
/// serializable report which the binary prints as JSON.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use dipnet_core::{
    Amount, BusinessId, DownlineEntry, Member, MemberRegistry, OrderedItem, Upline,
    UplineResolver,
};
use dipnet_economics::integration::DipnetEconomics;
use dipnet_economics::{CommissionBreakdown, CommissionLedger, EngineConfig, LegDrift, PayoutStatement};

/// Build a registry from a JSON array of members
pub fn load_members(path: &Path) -> Result<MemberRegistry> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading members from {}", path.display()))?;
    let members: Vec<Member> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing members in {}", path.display()))?;
    let registry = MemberRegistry::from_members(members).context("building member registry")?;
    info!(members = registry.len(), "Loaded member registry");
    Ok(registry)
}

/// Read a JSON array of sales
pub fn load_sales(path: &Path) -> Result<Vec<OrderedItem>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading sales from {}", path.display()))?;
    let sales: Vec<OrderedItem> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing sales in {}", path.display()))?;
    info!(sales = sales.len(), "Loaded sales");
    Ok(sales)
}

/// Restore a ledger snapshot, verifying every entry hash
pub fn load_ledger(path: &Path) -> Result<CommissionLedger> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading ledger from {}", path.display()))?;
    CommissionLedger::restore(&raw).with_context(|| format!("restoring ledger {}", path.display()))
}

/// Engine over an optional member file and optional config file
pub fn open_engine(members: Option<&Path>, config: Option<&Path>) -> Result<DipnetEconomics> {
    let config = EngineConfig::load(config).context("loading engine configuration")?;
    let registry = match members {
        Some(path) => load_members(path)?,
        None => {
            warn!("No member file given, every network leg will be unpaid");
            MemberRegistry::new()
        }
    };
    DipnetEconomics::new(config, registry).context("starting commission engine")
}

/// Quote for a price that is not tied to a recorded sale
pub fn quote(
    econ: &DipnetEconomics,
    price: Amount,
    sponsor: Option<BusinessId>,
    stockist: Option<BusinessId>,
) -> Result<CommissionBreakdown> {
    let mut item = OrderedItem::new(0, "quote", price);
    item.sponsor = sponsor;
    item.stockist = stockist;
    let mut breakdown = econ.breakdown(&item).context("computing quote")?;
    breakdown.sale_id = None;
    Ok(breakdown)
}

pub fn sale_breakdown(
    econ: &DipnetEconomics,
    sales: &[OrderedItem],
    sale_id: u64,
) -> Result<CommissionBreakdown> {
    let sale = sales
        .iter()
        .find(|s| s.id == sale_id)
        .ok_or_else(|| anyhow!("sale {} not found", sale_id))?;
    econ.breakdown(sale)
        .with_context(|| format!("computing breakdown for sale {}", sale_id))
}

#[derive(Debug, Clone, Serialize)]
pub struct UplineReport {
    pub member: BusinessId,
    pub upline: Upline,
}

pub fn upline_report(econ: &DipnetEconomics, member: &BusinessId) -> Result<UplineReport> {
    let resolver = UplineResolver::with_depth(&econ.registry, econ.config.max_depth);
    let upline = resolver
        .upline_of_id(member)
        .ok_or_else(|| anyhow!("member {} not found", member))?;
    Ok(UplineReport {
        member: member.clone(),
        upline,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DownlineReport {
    pub member: BusinessId,
    pub max_depth: usize,
    pub count: usize,
    pub entries: Vec<DownlineEntry>,
}

pub fn downline_report(
    econ: &DipnetEconomics,
    member: &BusinessId,
    max_depth: Option<usize>,
) -> Result<DownlineReport> {
    let max_depth = max_depth.unwrap_or(econ.config.max_depth);
    let entries = econ
        .registry
        .downline(member, max_depth)
        .with_context(|| format!("walking downline of {}", member))?;
    Ok(DownlineReport {
        member: member.clone(),
        max_depth,
        count: entries.len(),
        entries,
    })
}

pub fn statement(econ: &DipnetEconomics, sales: &[OrderedItem]) -> Result<PayoutStatement> {
    econ.statement(sales).context("building payout statement")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordReport {
    pub recorded: Vec<u64>,
    pub already_recorded: Vec<u64>,
    pub entries: usize,
}

/// Freeze every sale not yet in the ledger file and write the file back
pub fn record_sales(
    econ: &mut DipnetEconomics,
    sales: &[OrderedItem],
    ledger_path: &Path,
) -> Result<RecordReport> {
    if ledger_path.exists() {
        econ.ledger = load_ledger(ledger_path)?;
    }

    let mut report = RecordReport::default();
    for sale in sales {
        if econ.ledger.get(sale.id).is_some() {
            debug!(sale = sale.id, "Sale already recorded");
            report.already_recorded.push(sale.id);
            continue;
        }
        econ.record_sale(sale)
            .with_context(|| format!("recording sale {}", sale.id))?;
        report.recorded.push(sale.id);
    }

    let snapshot = econ.ledger.snapshot().context("serializing ledger")?;
    fs::write(ledger_path, snapshot)
        .with_context(|| format!("writing ledger to {}", ledger_path.display()))?;
    report.entries = econ.ledger.len();
    info!(
        recorded = report.recorded.len(),
        entries = report.entries,
        "Ledger written"
    );
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleDrift {
    pub sale_id: u64,
    pub legs: Vec<LegDrift>,
}

/// Recorded sales whose current projection no longer matches the ledger
pub fn drift_report(
    econ: &mut DipnetEconomics,
    sales: &[OrderedItem],
    ledger_path: &Path,
) -> Result<Vec<SaleDrift>> {
    econ.ledger = load_ledger(ledger_path)?;

    let mut drifted = Vec::new();
    for sale in sales {
        if econ.ledger.get(sale.id).is_none() {
            debug!(sale = sale.id, "Sale not recorded, skipping");
            continue;
        }
        let legs = econ
            .drift(sale)
            .with_context(|| format!("comparing sale {}", sale.id))?;
        if !legs.is_empty() {
            drifted.push(SaleDrift {
                sale_id: sale.id,
                legs,
            });
        }
    }
    Ok(drifted)
}

/// JSON rendering shared by every command
pub fn render<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("rendering output")
}

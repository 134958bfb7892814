/// COMMISSION LEDGER
///
/// Breakdowns are normally a read-time projection: recomputing an old sale
/// after a sponsor reassignment gives different figures. The ledger lets a
/// caller freeze a breakdown when the sale happens. Entries are immutable and
/// carry a SHA-256 commitment over every leg; `drift` compares a frozen entry
/// with a fresh projection without touching either.

use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use dipnet_core::{Amount, BusinessId};

use crate::calculator::{Beneficiary, CalculationError, CommissionBreakdown};
use crate::rates::TierLevel;

/// Frozen breakdown of one sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: u64,
    pub sale_id: u64,
    pub breakdown: CommissionBreakdown,
    pub recorded_at: DateTime<Utc>,
    /// Commitment over the fields above
    #[serde(with = "hex::serde")]
    pub entry_hash: Vec<u8>,
}

fn hash_beneficiary(hasher: &mut Sha256, beneficiary: Option<&Beneficiary>) {
    match beneficiary {
        Some(b) => {
            hasher.update([1u8]);
            hasher.update((b.business_id.as_str().len() as u64).to_le_bytes());
            hasher.update(b.business_id.as_str().as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

impl LedgerEntry {
    pub fn compute_hash(&self) -> Vec<u8> {
        let b = &self.breakdown;
        let mut hasher = Sha256::new();
        hasher.update(self.entry_id.to_le_bytes());
        hasher.update(self.sale_id.to_le_bytes());
        hasher.update(self.recorded_at.timestamp_micros().to_le_bytes());
        hasher.update(b.price.minor().to_le_bytes());

        hash_beneficiary(&mut hasher, b.stockist.as_ref());
        hasher.update(b.stockist_rate_bps.to_le_bytes());
        hasher.update(b.stockist_commission.minor().to_le_bytes());

        hasher.update((b.levels.len() as u64).to_le_bytes());
        for level in &b.levels {
            hasher.update([level.generation]);
            hasher.update(level.rate_bps.to_le_bytes());
            hash_beneficiary(&mut hasher, level.beneficiary.as_ref());
            hasher.update(level.amount.minor().to_le_bytes());
        }

        hasher.update(b.total_commission.minor().to_le_bytes());
        hasher.update(b.company_balance.minor().to_le_bytes());
        hasher.update(b.unpaid_commission.minor().to_le_bytes());
        hasher.finalize().to_vec()
    }

    pub fn verify_hash(&self) -> Result<(), LedgerError> {
        if self.compute_hash() != self.entry_hash {
            return Err(LedgerError::HashMismatch(self.sale_id));
        }
        Ok(())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(&self.entry_hash)
    }
}

/// A leg whose recorded and recomputed values differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegDrift {
    pub leg: TierLevel,
    pub recorded_beneficiary: Option<BusinessId>,
    pub current_beneficiary: Option<BusinessId>,
    pub recorded_amount: Amount,
    pub current_amount: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommissionLedger {
    /// Entries keyed by sale id
    entries: BTreeMap<u64, LedgerEntry>,
    next_entry_id: u64,
}

impl CommissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, breakdown: CommissionBreakdown) -> Result<&LedgerEntry, LedgerError> {
        self.record_at(breakdown, Utc::now())
    }

    /// Record with an explicit timestamp
    pub fn record_at(
        &mut self,
        breakdown: CommissionBreakdown,
        recorded_at: DateTime<Utc>,
    ) -> Result<&LedgerEntry, LedgerError> {
        let sale_id = breakdown.sale_id.ok_or(LedgerError::MissingSaleId)?;
        if self.entries.contains_key(&sale_id) {
            return Err(LedgerError::AlreadyRecorded(sale_id));
        }
        breakdown.verify()?;

        let mut entry = LedgerEntry {
            entry_id: self.next_entry_id,
            sale_id,
            breakdown,
            recorded_at,
            entry_hash: vec![],
        };
        entry.entry_hash = entry.compute_hash();
        self.next_entry_id += 1;

        info!(
            "Recorded commission for sale {}: total {} balance {} ({})",
            sale_id,
            entry.breakdown.total_commission,
            entry.breakdown.company_balance,
            entry.hash_hex()
        );
        Ok(self.entries.entry(sale_id).or_insert(entry))
    }

    pub fn get(&self, sale_id: u64) -> Option<&LedgerEntry> {
        self.entries.get(&sale_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sale id order
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    pub fn verify_all(&self) -> Result<(), LedgerError> {
        for entry in self.entries.values() {
            entry.verify_hash()?;
        }
        Ok(())
    }

    /// Compare a recorded sale with a fresh projection of the same sale
    pub fn drift(
        &self,
        sale_id: u64,
        recomputed: &CommissionBreakdown,
    ) -> Result<Vec<LegDrift>, LedgerError> {
        let entry = self
            .entries
            .get(&sale_id)
            .ok_or(LedgerError::EntryNotFound(sale_id))?;
        let recorded = &entry.breakdown;
        let mut drift = Vec::new();

        let stockist_id = |b: &CommissionBreakdown| b.stockist.as_ref().map(|s| s.business_id.clone());
        if stockist_id(recorded) != stockist_id(recomputed)
            || recorded.stockist_commission != recomputed.stockist_commission
        {
            drift.push(LegDrift {
                leg: TierLevel::Stockist,
                recorded_beneficiary: stockist_id(recorded),
                current_beneficiary: stockist_id(recomputed),
                recorded_amount: recorded.stockist_commission,
                current_amount: recomputed.stockist_commission,
            });
        }

        let generations = recorded.levels.len().max(recomputed.levels.len());
        for generation in 1..=generations {
            let beneficiary = |b: &CommissionBreakdown| {
                b.level(generation)
                    .and_then(|l| l.beneficiary.as_ref())
                    .map(|ben| ben.business_id.clone())
            };
            let (before, after) = (beneficiary(recorded), beneficiary(recomputed));
            let (old_amount, new_amount) =
                (recorded.level_amount(generation), recomputed.level_amount(generation));
            if before != after || old_amount != new_amount {
                drift.push(LegDrift {
                    leg: TierLevel::Generation(generation as u8),
                    recorded_beneficiary: before,
                    current_beneficiary: after,
                    recorded_amount: old_amount,
                    current_amount: new_amount,
                });
            }
        }

        if !drift.is_empty() {
            warn!("Sale {} projection drifted on {} legs", sale_id, drift.len());
        }
        Ok(drift)
    }

    /// Serialize every entry to JSON
    pub fn snapshot(&self) -> Result<String, LedgerError> {
        serde_json::to_string(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Load a snapshot, rejecting it if any entry fails verification
    pub fn restore(json: &str) -> Result<Self, LedgerError> {
        let ledger: CommissionLedger =
            serde_json::from_str(json).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        for (sale_id, entry) in &ledger.entries {
            if *sale_id != entry.sale_id {
                return Err(LedgerError::KeyMismatch {
                    key: *sale_id,
                    sale_id: entry.sale_id,
                });
            }
        }
        ledger.verify_all()?;
        Ok(ledger)
    }
}

/// Ledger handle shared across request threads
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<CommissionLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: CommissionLedger) -> Self {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Record and return a copy of the new entry
    pub fn record(&self, breakdown: CommissionBreakdown) -> Result<LedgerEntry, LedgerError> {
        let mut ledger = self.inner.write();
        ledger.record(breakdown).map(LedgerEntry::clone)
    }

    pub fn get(&self, sale_id: u64) -> Option<LedgerEntry> {
        self.inner.read().get(sale_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn verify_all(&self) -> Result<(), LedgerError> {
        self.inner.read().verify_all()
    }

    pub fn snapshot(&self) -> Result<String, LedgerError> {
        self.inner.read().snapshot()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Breakdown has no sale id")]
    MissingSaleId,
    #[error("Sale {0} already recorded")]
    AlreadyRecorded(u64),
    #[error("No ledger entry for sale {0}")]
    EntryNotFound(u64),
    #[error("Ledger entry hash mismatch for sale {0}")]
    HashMismatch(u64),
    #[error("Ledger entry stored under sale {key} belongs to sale {sale_id}")]
    KeyMismatch { key: u64, sale_id: u64 },
    #[error("Invalid breakdown: {0}")]
    InvalidBreakdown(#[from] CalculationError),
    #[error("Ledger serialization failed: {0}")]
    Serialization(String),
}

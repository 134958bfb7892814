/// COMMISSION CALCULATOR
///
/// Splits a sale price into a stockist leg, one leg per network generation
/// and the residual company balance. Pure and deterministic: the same price,
/// stockist and upline always give the same breakdown.
///
/// Each leg is rounded on its own, then paid legs are held to the floored
/// share of their combined rate so rounding never eats into the company's
/// part. The total is the exact sum of the legs and the balance is whatever
/// remains, so `stockist + Σ generations + balance == price` holds for every
/// sale.
/// A generation with no ancestor pays nothing and its share stays with the
/// company; it is never redistributed to other levels.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dipnet_core::{
    sale_upline, Amount, BusinessId, Member, MemberDirectory, OrderedItem, SaleError, Termination,
    Upline,
};

use crate::rates::{RateTable, BPS_DENOMINATOR};

/// Per-leg rounding of `price × rate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half a minor unit up
    #[default]
    HalfUp,
    /// Truncate toward zero
    Floor,
}

impl RoundingMode {
    /// Apply a basis-point rate to an amount
    pub fn apply(&self, price: Amount, rate_bps: u32) -> Result<Amount, CalculationError> {
        let product = price
            .minor()
            .checked_mul(rate_bps as u128)
            .ok_or(CalculationError::Overflow)?;
        let denominator = BPS_DENOMINATOR as u128;
        let quotient = product / denominator;
        let remainder = product % denominator;

        let minor = match self {
            RoundingMode::Floor => quotient,
            RoundingMode::HalfUp if remainder * 2 >= denominator => quotient + 1,
            RoundingMode::HalfUp => quotient,
        };
        Ok(Amount::from_minor(minor))
    }
}

/// Member receiving a leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub business_id: BusinessId,
    pub internal_id: u64,
    pub name: String,
}

impl From<&Member> for Beneficiary {
    fn from(member: &Member) -> Self {
        Beneficiary {
            business_id: member.business_id.clone(),
            internal_id: member.internal_id,
            name: member.name.clone(),
        }
    }
}

/// Commission for one network generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCommission {
    /// 1-based generation (Gn1 is the direct sponsor)
    pub generation: u8,
    pub rate_bps: u32,
    /// `None` when no member sits at this generation
    pub beneficiary: Option<Beneficiary>,
    /// Zero when `beneficiary` is `None`
    pub amount: Amount,
}

impl LevelCommission {
    pub fn is_paid(&self) -> bool {
        self.beneficiary.is_some()
    }
}

/// Structured result of a commission computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub sale_id: Option<u64>,
    pub price: Amount,
    pub stockist: Option<Beneficiary>,
    pub stockist_rate_bps: u32,
    pub stockist_commission: Amount,
    /// One entry per configured generation, paid or not
    pub levels: Vec<LevelCommission>,
    pub total_commission: Amount,
    pub company_balance: Amount,
    /// Legs left unpaid because the stockist or an ancestor was missing
    pub unpaid_commission: Amount,
    pub upline_termination: Termination,
    pub rounding: RoundingMode,
}

impl CommissionBreakdown {
    /// Leg for a 1-based generation
    pub fn level(&self, generation: usize) -> Option<&LevelCommission> {
        generation.checked_sub(1).and_then(|i| self.levels.get(i))
    }

    /// Amount paid at a generation, zero for absent or unconfigured levels
    pub fn level_amount(&self, generation: usize) -> Amount {
        self.level(generation).map_or(Amount::ZERO, |l| l.amount)
    }

    pub fn network_commission(&self) -> Amount {
        self.levels.iter().map(|l| l.amount).sum()
    }

    pub fn paid_generations(&self) -> usize {
        self.levels.iter().filter(|l| l.is_paid()).count()
    }

    /// Every paid leg as (beneficiary, amount), stockist first
    pub fn beneficiaries(&self) -> Vec<(&Beneficiary, Amount)> {
        let stockist = self
            .stockist
            .as_ref()
            .map(|b| (b, self.stockist_commission));
        stockist
            .into_iter()
            .chain(
                self.levels
                    .iter()
                    .filter_map(|l| l.beneficiary.as_ref().map(|b| (b, l.amount))),
            )
            .collect()
    }

    /// Re-check the accounting identities
    pub fn verify(&self) -> Result<(), CalculationError> {
        let legs = self
            .stockist_commission
            .checked_add(self.network_commission())
            .ok_or(CalculationError::Overflow)?;
        if legs != self.total_commission {
            return Err(CalculationError::Inconsistent(format!(
                "legs sum to {} but total is {}",
                legs, self.total_commission
            )));
        }
        let accounted = self
            .total_commission
            .checked_add(self.company_balance)
            .ok_or(CalculationError::Overflow)?;
        if accounted != self.price {
            return Err(CalculationError::Inconsistent(format!(
                "total {} plus balance {} != price {}",
                self.total_commission, self.company_balance, self.price
            )));
        }
        if self.stockist.is_none() && !self.stockist_commission.is_zero() {
            return Err(CalculationError::Inconsistent(
                "stockist commission without stockist".to_string(),
            ));
        }
        if let Some(level) = self.levels.iter().find(|l| !l.is_paid() && !l.amount.is_zero()) {
            return Err(CalculationError::Inconsistent(format!(
                "generation {} paid without beneficiary",
                level.generation
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionCalculator {
    rate_table: RateTable,
    rounding: RoundingMode,
}

impl CommissionCalculator {
    pub fn new(rate_table: RateTable, rounding: RoundingMode) -> Self {
        CommissionCalculator { rate_table, rounding }
    }

    pub fn rate_table(&self) -> &RateTable {
        &self.rate_table
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Compute the breakdown for a price, an optional stockist and a resolved
    /// upline (index 0 = generation 1).
    pub fn compute(
        &self,
        price: Amount,
        stockist: Option<&Member>,
        upline: &Upline,
    ) -> Result<CommissionBreakdown, CalculationError> {
        let mut unpaid = Amount::ZERO;

        let stockist_rate_bps = self.rate_table.stockist_rate_bps();
        let stockist_share = self.rounding.apply(price, stockist_rate_bps)?;
        let mut stockist_commission = if stockist.is_some() {
            stockist_share
        } else {
            unpaid = unpaid.saturating_add(stockist_share);
            Amount::ZERO
        };

        let mut levels = Vec::with_capacity(self.rate_table.generations());
        for (index, &rate_bps) in self.rate_table.generation_rates_bps().iter().enumerate() {
            let generation = index + 1;
            let share = self.rounding.apply(price, rate_bps)?;
            let beneficiary = upline.level(generation).map(Beneficiary::from);
            let amount = if beneficiary.is_some() {
                share
            } else {
                unpaid = unpaid.saturating_add(share);
                Amount::ZERO
            };
            levels.push(LevelCommission {
                generation: generation as u8,
                rate_bps,
                beneficiary,
                amount,
            });
        }

        let mut paid_legs: Vec<(&mut Amount, u32)> = Vec::with_capacity(levels.len() + 1);
        if stockist.is_some() {
            paid_legs.push((&mut stockist_commission, stockist_rate_bps));
        }
        paid_legs.extend(
            levels
                .iter_mut()
                .filter(|l| l.is_paid())
                .map(|l| (&mut l.amount, l.rate_bps)),
        );
        let total_commission = cap_rounding(price, &mut paid_legs)?;
        let company_balance = price
            .checked_sub(total_commission)
            .ok_or(CalculationError::CommissionExceedsPrice {
                price,
                commission: total_commission,
            })?;

        Ok(CommissionBreakdown {
            sale_id: None,
            price,
            stockist: stockist.map(Beneficiary::from),
            stockist_rate_bps,
            stockist_commission,
            levels,
            total_commission,
            company_balance,
            unpaid_commission: unpaid,
            upline_termination: upline.termination.clone(),
            rounding: self.rounding,
        })
    }

    /// Resolve the sale's stockist and sponsor chain through the directory
    /// and compute its breakdown.
    pub fn compute_for_sale<D: MemberDirectory + ?Sized>(
        &self,
        sale: &OrderedItem,
        directory: &D,
        max_depth: usize,
    ) -> Result<CommissionBreakdown, CalculationError> {
        sale.validate()?;
        let price = sale.price()?;

        let stockist = match &sale.stockist {
            Some(id) => {
                let found = directory.find_by_business_id(id);
                match found {
                    Some(member) if !member.is_stockist() => {
                        debug!("Sale {} stockist {} is not flagged as stockist", sale.id, id);
                    }
                    None => warn!("Sale {} stockist {} not found, leg unpaid", sale.id, id),
                    _ => {}
                }
                found
            }
            None => None,
        };

        let upline = sale_upline(directory, sale.sponsor.as_ref(), max_depth);
        let mut breakdown = self.compute(price, stockist, &upline)?;
        breakdown.sale_id = Some(sale.id);

        debug!(
            "Sale {}: price {} commission {} balance {} ({} generations paid)",
            sale.id,
            breakdown.price,
            breakdown.total_commission,
            breakdown.company_balance,
            breakdown.paid_generations()
        );
        Ok(breakdown)
    }
}

/// Keep rounded legs within the floored share of their combined rate.
///
/// Half-up rounding on every leg can overshoot `price × Σ rates`. The excess
/// is given back starting from the last paid leg, never taking a leg below
/// its floored value, so the sum of paid legs is at most
/// `floor(price × Σ paid rates)`. Returns that sum.
fn cap_rounding(price: Amount, legs: &mut [(&mut Amount, u32)]) -> Result<Amount, CalculationError> {
    let paid_bps = legs.iter().map(|(_, bps)| *bps as u128).sum::<u128>();
    let cap = price
        .minor()
        .checked_mul(paid_bps)
        .map(|product| Amount::from_minor(product / BPS_DENOMINATOR as u128))
        .ok_or(CalculationError::Overflow)?;

    let mut total = legs
        .iter()
        .try_fold(Amount::ZERO, |acc, (amount, _)| acc.checked_add(**amount))
        .ok_or(CalculationError::Overflow)?;

    for (amount, bps) in legs.iter_mut().rev() {
        let excess = total.saturating_sub(cap);
        if excess.is_zero() {
            break;
        }
        let floor = RoundingMode::Floor.apply(price, *bps)?;
        let give_back = amount.saturating_sub(floor).min(excess);
        **amount = amount.saturating_sub(give_back);
        total = total.saturating_sub(give_back);
    }

    Ok(total)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculationError {
    #[error("Invalid sale: {0}")]
    InvalidSale(#[from] SaleError),
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Commission {commission} exceeds price {price}")]
    CommissionExceedsPrice { price: Amount, commission: Amount },
    #[error("Inconsistent breakdown: {0}")]
    Inconsistent(String),
}

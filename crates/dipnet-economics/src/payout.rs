/// PAYOUT STATEMENTS
///
/// Aggregates many sale breakdowns into per-member earnings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use dipnet_core::{Amount, BusinessId};

use crate::calculator::CommissionBreakdown;

/// Earnings of one member across a set of sales
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEarnings {
    pub name: String,
    pub stockist_earnings: Amount,
    pub network_earnings: Amount,
    /// Network earnings split by generation
    pub by_generation: BTreeMap<u8, Amount>,
    /// Sales this member earned anything on
    pub sales_count: u32,
}

impl MemberEarnings {
    pub fn total(&self) -> Amount {
        self.stockist_earnings.saturating_add(self.network_earnings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutStatement {
    pub members: BTreeMap<BusinessId, MemberEarnings>,
    pub sales_count: u32,
    pub gross_sales: Amount,
    pub total_commission: Amount,
    pub company_balance: Amount,
    pub unpaid_commission: Amount,
}

impl PayoutStatement {
    pub fn from_breakdowns<'a, I>(breakdowns: I) -> Self
    where
        I: IntoIterator<Item = &'a CommissionBreakdown>,
    {
        let mut statement = PayoutStatement::default();
        for breakdown in breakdowns {
            statement.add(breakdown);
        }
        statement
    }

    pub fn add(&mut self, breakdown: &CommissionBreakdown) {
        self.sales_count += 1;
        self.gross_sales = self.gross_sales.saturating_add(breakdown.price);
        self.total_commission = self.total_commission.saturating_add(breakdown.total_commission);
        self.company_balance = self.company_balance.saturating_add(breakdown.company_balance);
        self.unpaid_commission = self
            .unpaid_commission
            .saturating_add(breakdown.unpaid_commission);

        // A member can hold the stockist leg and a generation on the same sale
        let mut touched: Vec<&BusinessId> = Vec::new();

        if let Some(stockist) = &breakdown.stockist {
            let earnings = self.members.entry(stockist.business_id.clone()).or_default();
            earnings.name = stockist.name.clone();
            earnings.stockist_earnings = earnings
                .stockist_earnings
                .saturating_add(breakdown.stockist_commission);
            touched.push(&stockist.business_id);
        }

        for level in &breakdown.levels {
            let Some(beneficiary) = &level.beneficiary else {
                continue;
            };
            let earnings = self.members.entry(beneficiary.business_id.clone()).or_default();
            earnings.name = beneficiary.name.clone();
            earnings.network_earnings = earnings.network_earnings.saturating_add(level.amount);
            let slot = earnings.by_generation.entry(level.generation).or_default();
            *slot = slot.saturating_add(level.amount);
            touched.push(&beneficiary.business_id);
        }

        touched.sort();
        touched.dedup();
        for id in touched {
            if let Some(earnings) = self.members.get_mut(id) {
                earnings.sales_count += 1;
            }
        }
    }

    pub fn earnings_for(&self, id: &BusinessId) -> Option<&MemberEarnings> {
        self.members.get(id)
    }

    /// Sum of every member's earnings; equals `total_commission`
    pub fn paid_out(&self) -> Amount {
        self.members.values().map(MemberEarnings::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CommissionCalculator;
    use dipnet_core::{Member, MemberRegistry, OrderedItem, MAX_GENERATIONS};

    fn id(raw: &str) -> BusinessId {
        BusinessId::new(raw).unwrap()
    }

    #[test]
    fn test_statement_aggregates_sales() {
        let registry = MemberRegistry::from_members(vec![
            Member::new(1, id("TOP"), "Top"),
            Member::new(2, id("MID"), "Mid").with_sponsor(id("TOP")),
            Member::new(3, id("STK"), "Stockist").with_sponsor(id("TOP")),
        ])
        .unwrap();
        let calc = CommissionCalculator::default();

        let sales = vec![
            OrderedItem::new(1, "cow", Amount::from_major(1_000))
                .with_sponsor(id("MID"))
                .with_stockist(id("STK")),
            OrderedItem::new(2, "goat", Amount::from_major(500))
                .with_sponsor(id("STK"))
                .with_stockist(id("STK")),
        ];
        let breakdowns: Vec<_> = sales
            .iter()
            .map(|s| calc.compute_for_sale(s, &registry, MAX_GENERATIONS).unwrap())
            .collect();
        let statement = PayoutStatement::from_breakdowns(&breakdowns);

        assert_eq!(statement.sales_count, 2);
        assert_eq!(statement.gross_sales, Amount::from_major(1_500));

        // Stockist: 8% of both sales plus Gn1 (3%) on the goat
        let stk = statement.earnings_for(&id("STK")).unwrap();
        assert_eq!(stk.stockist_earnings, Amount::from_major(120));
        assert_eq!(stk.network_earnings, Amount::from_major(15));
        assert_eq!(stk.sales_count, 2);

        // Top: Gn2 on both sales (2.5%)
        let top = statement.earnings_for(&id("TOP")).unwrap();
        assert_eq!(top.network_earnings, Amount::from_minor(3_750));
        assert_eq!(top.by_generation.get(&2), Some(&Amount::from_minor(3_750)));
        assert_eq!(top.name, "Top");

        assert_eq!(statement.paid_out(), statement.total_commission);
        assert_eq!(
            statement.total_commission.saturating_add(statement.company_balance),
            statement.gross_sales
        );
    }

    #[test]
    fn test_empty_statement() {
        let statement = PayoutStatement::from_breakdowns(std::iter::empty());
        assert_eq!(statement.sales_count, 0);
        assert!(statement.members.is_empty());
        assert_eq!(statement.paid_out(), Amount::ZERO);
    }
}

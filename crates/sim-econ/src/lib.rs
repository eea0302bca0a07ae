#![deny(warnings)]

//! Financial aggregation and sale-volume arithmetic for Vendsim.
//!
//! This crate provides the pure numeric half of the day simulation:
//! - Daily financial recomputation (revenue / COGS / expenses / profit)
//! - Grand-total profitability across all simulated days
//! - The stochastic daily sale-count draw with weekday scaling
//!
//! Everything here is a function of its inputs; randomness comes in through
//! a caller-supplied `rand::Rng` so tests can pin sequences.

use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{round_money, DailyEntry, FinancialLedger, SaleRecord};
use std::collections::BTreeMap;

/// Draw the target sale count for one day.
///
/// `round(uniform(min..=max) * multiplier)`, floored at zero. The caller
/// guarantees `min <= max` (config validation); multipliers under 1.0 damp
/// slow weekdays, over 1.0 boost busy ones.
///
/// Example:
/// let mut rng = rand::thread_rng();
/// let n = target_sale_count(&mut rng, 5, 20, 1.1);
/// assert!(n >= 5);
pub fn target_sale_count<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32, multiplier: f64) -> u32 {
    let base = rng.gen_range(min..=max);
    let scaled = (base as f64 * multiplier).round();
    if scaled <= 0.0 {
        0
    } else {
        scaled as u32
    }
}

/// Recompute the financial entry for `date` from that day's sale records
/// plus the configured expense map, overwriting any prior entry.
///
/// Sums run at full precision; each persisted field is rounded to 4
/// decimal places. Idempotent: identical inputs yield an identical entry.
///
/// Example:
/// `update_daily` over records (6.25/2.5) and (3.00/0.9) with expenses
/// {electricity: 1.0, maintenance: 1.0} writes
/// {revenue: 9.25, cogs: 3.4, expenses: 2.0, profit: 3.85}.
pub fn update_daily(
    ledger: &mut FinancialLedger,
    date: NaiveDate,
    records: &[&SaleRecord],
    expense_config: &BTreeMap<String, Decimal>,
) -> DailyEntry {
    let revenue: Decimal = records.iter().map(|r| r.revenue).sum();
    let cogs: Decimal = records.iter().map(|r| r.cogs).sum();
    let expenses: Decimal = expense_config.values().copied().sum();
    let entry = DailyEntry {
        revenue: round_money(revenue),
        cogs: round_money(cogs),
        expenses: round_money(expenses),
        profit: round_money(revenue - (cogs + expenses)),
    };
    tracing::debug!(%date, sales = records.len(), profit = %entry.profit, "daily financials updated");
    ledger.insert(date, entry.clone());
    entry
}

/// Grand totals plus the per-day map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfitSummary {
    /// Plain sums across every simulated day.
    pub total: DailyEntry,
    /// Per-day entries, chronologically keyed.
    pub per_day: FinancialLedger,
}

/// Sum profitability across all simulated days.
///
/// An empty ledger yields all-zero totals and an empty per-day map; this
/// never fails.
pub fn aggregate_profitability(ledger: &FinancialLedger) -> ProfitSummary {
    let mut total = DailyEntry::default();
    for entry in ledger.values() {
        total.revenue += entry.revenue;
        total.cogs += entry.cogs;
        total.expenses += entry.expenses;
        total.profit += entry.profit;
    }
    total.revenue = round_money(total.revenue);
    total.cogs = round_money(total.cogs);
    total.expenses = round_money(total.expenses);
    total.profit = round_money(total.profit);
    ProfitSummary {
        total,
        per_day: ledger.clone(),
    }
}

/// Most recent day with a financial entry, if any.
///
/// `BTreeMap` keys are chronologically ordered, so this is the last key.
pub fn latest_day(ledger: &FinancialLedger) -> Option<NaiveDate> {
    ledger.keys().next_back().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record(date: &str, revenue: &str, cogs: &str) -> SaleRecord {
        SaleRecord::new(d(date), "Coke", 1, dec(revenue), dec(cogs))
    }

    #[test]
    fn update_daily_worked_example() {
        let mut ledger = FinancialLedger::new();
        let a = record("2025-09-01", "6.25", "2.5");
        let b = record("2025-09-01", "3.00", "0.9");
        let expenses = BTreeMap::from([
            ("electricity".to_string(), dec("1.0")),
            ("maintenance".to_string(), dec("1.0")),
        ]);
        let entry = update_daily(&mut ledger, d("2025-09-01"), &[&a, &b], &expenses);
        assert_eq!(entry.revenue, dec("9.25"));
        assert_eq!(entry.cogs, dec("3.4"));
        assert_eq!(entry.expenses, dec("2.0"));
        assert_eq!(entry.profit, dec("3.85"));
        assert_eq!(ledger[&d("2025-09-01")], entry);
    }

    #[test]
    fn update_daily_is_idempotent_and_overwrites() {
        let mut ledger = FinancialLedger::new();
        let a = record("2025-09-01", "6.25", "2.5");
        let expenses = BTreeMap::from([("electricity".to_string(), dec("1.0"))]);
        let first = update_daily(&mut ledger, d("2025-09-01"), &[&a], &expenses);
        let second = update_daily(&mut ledger, d("2025-09-01"), &[&a], &expenses);
        assert_eq!(first, second);
        assert_eq!(ledger.len(), 1);

        // Recomputing with fewer records replaces, not accumulates.
        let third = update_daily(&mut ledger, d("2025-09-01"), &[], &expenses);
        assert_eq!(third.revenue, Decimal::ZERO);
        assert_eq!(third.profit, dec("-1.0"));
    }

    #[test]
    fn empty_ledger_aggregates_to_zero() {
        let summary = aggregate_profitability(&FinancialLedger::new());
        assert_eq!(summary.total, DailyEntry::default());
        assert!(summary.per_day.is_empty());
    }

    #[test]
    fn aggregate_sums_across_days() {
        let mut ledger = FinancialLedger::new();
        let expenses = BTreeMap::from([("electricity".to_string(), dec("1.0"))]);
        let a = record("2025-09-01", "6.25", "2.5");
        let b = record("2025-09-02", "3.00", "0.9");
        update_daily(&mut ledger, d("2025-09-01"), &[&a], &expenses);
        update_daily(&mut ledger, d("2025-09-02"), &[&b], &expenses);
        let summary = aggregate_profitability(&ledger);
        assert_eq!(summary.total.revenue, dec("9.25"));
        assert_eq!(summary.total.cogs, dec("3.4"));
        assert_eq!(summary.total.expenses, dec("2.0"));
        assert_eq!(summary.total.profit, dec("3.85"));
        assert_eq!(summary.per_day.len(), 2);
    }

    #[test]
    fn latest_day_is_chronological_max() {
        let mut ledger = FinancialLedger::new();
        assert_eq!(latest_day(&ledger), None);
        for date in ["2025-09-01", "2025-09-10", "2025-08-30"] {
            ledger.insert(d(date), DailyEntry::default());
        }
        assert_eq!(latest_day(&ledger), Some(d("2025-09-10")));
    }

    #[test]
    fn target_count_is_seeded_and_scaled() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let a = target_sale_count(&mut rng, 5, 20, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let b = target_sale_count(&mut rng, 5, 20, 1.0);
        assert_eq!(a, b);
        assert!((5..=20).contains(&a));

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(target_sale_count(&mut rng, 3, 3, 0.0), 0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(target_sale_count(&mut rng, 4, 4, 0.5), 2);
    }

    proptest! {
        #[test]
        fn target_count_within_scaled_bounds(min in 0u32..50, span in 0u32..50,
                                             mult in 0.0f64..3.0, seed in 0u64..1000) {
            let max = min + span;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let n = target_sale_count(&mut rng, min, max, mult);
            let lo = (min as f64 * mult).round() as u32;
            let hi = (max as f64 * mult).round() as u32;
            prop_assert!(n >= lo);
            prop_assert!(n <= hi);
        }

        #[test]
        fn profit_identity_holds(rev in 0i64..1_000_000, cogs in 0i64..1_000_000,
                                 exp in 0i64..1_000_000) {
            let mut ledger = FinancialLedger::new();
            let r = SaleRecord::new(d("2025-09-01"), "Coke", 1,
                                    Decimal::new(rev, 4), Decimal::new(cogs, 4));
            let expenses = BTreeMap::from([("rent".to_string(), Decimal::new(exp, 4))]);
            let entry = update_daily(&mut ledger, d("2025-09-01"), &[&r], &expenses);
            prop_assert_eq!(entry.profit, entry.revenue - (entry.cogs + entry.expenses));
        }
    }
}

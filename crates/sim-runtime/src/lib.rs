#![deny(warnings)]

//! One-day simulation engine for Vendsim.
//!
//! [`DaySimulator`] is the single entry point for advancing the business by
//! one simulated day: it applies due restocks, generates stochastic sales,
//! recomputes the day's financial entry and moves the clock forward. Both
//! the interval scheduler and on-demand triggers call the same
//! [`DaySimulator::simulate_day`].

use chrono::{Datelike, NaiveDate};
use persistence::{Store, StoreError};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{sales_for_date, validate_config, AppliedRestock, ConfigError, Inventory, SaleRecord};
use thiserror::Error;
use tracing::{debug, info};

/// Failures surfaced by a day transition.
#[derive(Debug, Error)]
pub enum SimError {
    /// Ledger document could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Configuration failed validation; nothing was simulated.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The clock reached the end of the representable date range.
    #[error("simulation clock cannot advance past {0}")]
    ClockOverflow(NaiveDate),
}

/// Summary returned after one completed day transition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaySummary {
    /// The date that was simulated.
    pub date: NaiveDate,
    /// Units sold across all sale records dated that day.
    pub sales_count: u32,
    /// Day revenue as written to the financial ledger.
    pub revenue: Decimal,
    /// Day cost of goods sold.
    pub cogs: Decimal,
    /// Day operating expenses.
    pub expenses: Decimal,
    /// Day profit.
    pub profit: Decimal,
    /// Restocks that became due and were applied this day.
    pub restocks_applied: Vec<AppliedRestock>,
}

/// Drives one-day transitions over a store with an injectable RNG.
///
/// `simulate_day` takes `&mut self`, so a given simulator runs at most one
/// transition at a time; callers sharing one across threads must wrap it in
/// a mutex so day transitions cannot interleave. The store serializes the
/// individual ledger reads and writes underneath.
pub struct DaySimulator<S, R> {
    store: S,
    rng: R,
}

impl<S: Store> DaySimulator<S, ChaCha8Rng> {
    /// Simulator with a reproducible seeded RNG.
    pub fn seeded(store: S, seed: u64) -> Self {
        DaySimulator {
            store,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<S: Store, R: Rng> DaySimulator<S, R> {
    /// Simulator over an explicit random source.
    pub fn new(store: S, rng: R) -> Self {
        DaySimulator { store, rng }
    }

    /// Simulate exactly one day and advance the clock.
    ///
    /// Steps run in a fixed order: config validation, restock application,
    /// the sale loop, financial recomputation, clock advance. There is no
    /// cross-ledger transaction: if a later step fails, mutations committed
    /// by earlier steps remain in place.
    pub fn simulate_day(&mut self) -> Result<DaySummary, SimError> {
        let mut cfg = self.store.load_config()?;
        validate_config(&cfg)?;
        let today = cfg.simulation.current_date;

        let mut inventory = self.store.load_inventory()?;
        let restocks_applied = inventory.apply_restocks(today);
        if !restocks_applied.is_empty() {
            self.store.save_inventory(&inventory)?;
        }

        let sim = &cfg.sales_simulation;
        let target = sim_econ::target_sale_count(
            &mut self.rng,
            sim.min_sales_per_day,
            sim.max_sales_per_day,
            sim.multiplier(today.weekday()),
        );
        debug!(%today, target, "sale loop starting");

        let ceiling = sim.max_affordable_price;
        let mut sales = self.store.load_sales()?;
        for _ in 0..target {
            let Some((item, sell_price, cost_price)) =
                pick_eligible(&mut self.rng, &inventory, ceiling)
            else {
                // Nothing in stock and affordable; the day's selling ends here.
                break;
            };
            if inventory.deduct_stock(&item, 1) {
                sales.push(SaleRecord::new(today, &item, 1, sell_price, cost_price));
            }
        }
        self.store.save_inventory(&inventory)?;
        self.store.save_sales(&sales)?;

        let day_records = sales_for_date(&sales, today);
        let sales_count: u32 = day_records.iter().map(|r| r.qty).sum();
        let mut financials = self.store.load_financials()?;
        let entry = sim_econ::update_daily(&mut financials, today, &day_records, &cfg.operating_expenses);
        self.store.save_financials(&financials)?;

        cfg.simulation.last_simulated_date = Some(today);
        cfg.simulation.current_date = today.succ_opt().ok_or(SimError::ClockOverflow(today))?;
        self.store.save_config(&cfg)?;

        info!(
            %today,
            sales_count,
            revenue = %entry.revenue,
            profit = %entry.profit,
            restocks = restocks_applied.len(),
            "day simulated"
        );
        Ok(DaySummary {
            date: today,
            sales_count,
            revenue: entry.revenue,
            cogs: entry.cogs,
            expenses: entry.expenses,
            profit: entry.profit,
            restocks_applied,
        })
    }

    /// Run `n` consecutive day transitions, stopping at the first failure.
    pub fn run_days(&mut self, n: u32) -> Result<Vec<DaySummary>, SimError> {
        let mut summaries = Vec::with_capacity(n as usize);
        for _ in 0..n {
            summaries.push(self.simulate_day()?);
        }
        Ok(summaries)
    }
}

/// Uniform pick over items that are in stock and under the price ceiling.
///
/// Returns the picked name with a snapshot of its current sell/cost price.
fn pick_eligible<R: Rng>(
    rng: &mut R,
    inventory: &Inventory,
    ceiling: Option<Decimal>,
) -> Option<(String, Decimal, Decimal)> {
    let eligible: Vec<_> = inventory
        .iter()
        .filter(|(_, item)| {
            item.stock > 0 && ceiling.map_or(true, |limit| item.sell_price <= limit)
        })
        .collect();
    eligible
        .choose(rng)
        .map(|&(name, item)| (name.clone(), item.sell_price, item.cost_price))
}

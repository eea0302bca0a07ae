#![deny(warnings)]

//! Core domain models and ledger invariants for Vendsim.
//!
//! This crate defines the serializable types shared across the simulation —
//! inventory items, sale records, daily financial entries, the simulation
//! clock and configuration — together with the inventory ledger operations
//! and validation helpers that guarantee basic invariants. It performs no
//! I/O; persistence lives behind the store boundary.

use chrono::{Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Decimal places used when persisting currency values.
pub const MONEY_DP: u32 = 4;

/// Round a currency amount to persisted precision.
///
/// Intermediate sums are kept at full precision; rounding happens once at
/// the point a value is written into a ledger.
pub fn round_money(v: Decimal) -> Decimal {
    v.round_dp(MONEY_DP)
}

/// One stocked product slot in the machine.
///
/// Invariant: `restock_pending > 0` exactly when `restock_eta` is set; the
/// pair is written together by [`Inventory::place_order`] and cleared
/// together by [`Inventory::apply_restocks`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Units currently available for sale.
    pub stock: u32,
    /// Units ordered from the supplier but not yet received.
    pub restock_pending: u32,
    /// Date the pending order becomes eligible to apply, if one exists.
    pub restock_eta: Option<NaiveDate>,
    /// Unit cost paid to the supplier.
    pub cost_price: Decimal,
    /// Unit price charged to customers.
    pub sell_price: Decimal,
}

/// Per-item stock ledger, keyed by item name.
///
/// Backed by a `BTreeMap` so iteration order is deterministic — the day
/// simulator's seeded item picks depend on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<String, Item>,
}

/// Result of a successful [`Inventory::place_order`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Ordered item name.
    pub item: String,
    /// Total units now pending delivery for the item.
    pub restock_pending: u32,
    /// Date the pending units become due.
    pub restock_eta: NaiveDate,
}

/// One restock moved into stock by [`Inventory::apply_restocks`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedRestock {
    /// Restocked item name.
    pub item: String,
    /// Units added to stock.
    pub qty: u32,
}

/// Immutable record of a single unit sale.
///
/// `revenue` and `cogs` are snapshots of the item's sell/cost price at the
/// moment of sale, not references to current prices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Simulated date the sale occurred on.
    pub date: NaiveDate,
    /// Item sold.
    pub item: String,
    /// Units sold (always 1 in the simulator; kept for manual records).
    pub qty: u32,
    /// Sell price captured at sale time.
    pub revenue: Decimal,
    /// Cost price captured at sale time.
    pub cogs: Decimal,
}

impl SaleRecord {
    /// Build a record with revenue/cogs rounded to persisted precision.
    pub fn new(date: NaiveDate, item: &str, qty: u32, revenue: Decimal, cogs: Decimal) -> Self {
        SaleRecord {
            date,
            item: item.to_string(),
            qty,
            revenue: round_money(revenue),
            cogs: round_money(cogs),
        }
    }
}

/// Append-only list of recorded sales.
pub type SalesLedger = Vec<SaleRecord>;

/// Sale records for a single date, in ledger order.
pub fn sales_for_date(sales: &[SaleRecord], date: NaiveDate) -> Vec<&SaleRecord> {
    sales.iter().filter(|r| r.date == date).collect()
}

/// Accumulated cost of goods sold per item across the whole ledger.
pub fn cogs_per_product(sales: &[SaleRecord]) -> BTreeMap<String, Decimal> {
    let mut agg: BTreeMap<String, Decimal> = BTreeMap::new();
    for r in sales {
        *agg.entry(r.item.clone()).or_insert(Decimal::ZERO) += r.cogs;
    }
    agg
}

/// Financial aggregate for one simulated day.
///
/// All fields are derived: `profit = revenue - (cogs + expenses)`.
/// Recomputation for a date overwrites the prior entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    /// Summed sale revenue for the day.
    pub revenue: Decimal,
    /// Summed cost of goods sold for the day.
    pub cogs: Decimal,
    /// Summed configured operating expenses.
    pub expenses: Decimal,
    /// `revenue - (cogs + expenses)`.
    pub profit: Decimal,
}

/// Per-day financial entries keyed by date.
///
/// `BTreeMap` keeps keys chronologically ordered, which for ISO dates is
/// also lexicographic order.
pub type FinancialLedger = BTreeMap<NaiveDate, DailyEntry>;

/// Simulation clock state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Whether the scheduler should keep ticking.
    #[serde(default = "default_running")]
    pub running: bool,
    /// Next date to simulate.
    pub current_date: NaiveDate,
    /// Most recently completed day, if any.
    #[serde(default)]
    pub last_simulated_date: Option<NaiveDate>,
}

fn default_running() -> bool {
    true
}

/// Stochastic sale-generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesSimulation {
    /// Lower bound of the uniform daily sale-count draw.
    pub min_sales_per_day: u32,
    /// Upper bound of the uniform daily sale-count draw.
    pub max_sales_per_day: u32,
    /// Scale factors keyed by weekday index 0(Mon)–6(Sun); missing ⇒ 1.0.
    #[serde(default)]
    pub dow_multipliers: BTreeMap<u8, f64>,
    /// Price ceiling for eligible items; absent ⇒ no ceiling.
    #[serde(default)]
    pub max_affordable_price: Option<Decimal>,
}

impl SalesSimulation {
    /// Multiplier for a weekday, defaulting to 1.0 when unconfigured.
    pub fn multiplier(&self, weekday: Weekday) -> f64 {
        let idx = weekday.num_days_from_monday() as u8;
        self.dow_multipliers.get(&idx).copied().unwrap_or(1.0)
    }
}

/// Supplier terms applied to every order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierConfig {
    /// Days between placing an order and its ETA.
    pub lead_time_days: u32,
    /// Smallest quantity the supplier accepts.
    pub min_order_qty: u32,
}

/// Full configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Flat expense map, category name to daily amount.
    pub operating_expenses: BTreeMap<String, Decimal>,
    /// Sale-generation parameters.
    pub sales_simulation: SalesSimulation,
    /// Supplier terms.
    pub supplier: SupplierConfig,
    /// Simulation clock.
    pub simulation: SimClock,
    /// Wall-clock seconds between scheduler ticks.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    60
}

/// Inventory ledger operation failures.
///
/// Raised before any mutation, so a failed operation never leaves the
/// ledger partially updated.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// Referenced item is absent from the inventory.
    #[error("unknown item: {0}")]
    UnknownItem(String),
    /// Requested order quantity is under the supplier minimum.
    #[error("minimum order quantity is {min}, requested {requested}")]
    BelowMinimumOrder {
        /// Quantity the caller asked for.
        requested: u32,
        /// Supplier minimum in force.
        min: u32,
    },
}

/// Malformed configuration detected before a simulation step runs.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// `min_sales_per_day` exceeds `max_sales_per_day`.
    #[error("min_sales_per_day {min} exceeds max_sales_per_day {max}")]
    SalesBoundsInverted {
        /// Configured lower bound.
        min: u32,
        /// Configured upper bound.
        max: u32,
    },
    /// Weekday multiplier key outside 0..=6.
    #[error("weekday index {0} is out of range 0-6")]
    WeekdayOutOfRange(u8),
    /// Weekday multiplier is negative or non-finite.
    #[error("invalid day-of-week multiplier for weekday {0}")]
    InvalidMultiplier(u8),
    /// Operating expense amount is negative.
    #[error("negative operating expense: {0}")]
    NegativeExpense(String),
    /// Configured price ceiling is negative.
    #[error("max_affordable_price must be non-negative")]
    NegativePriceCeiling,
}

/// Validate a configuration document.
///
/// The day simulator calls this once per transition and fails fast rather
/// than silently defaulting malformed fields. Missing weekday multipliers
/// are the one sanctioned default (1.0) and are not an error.
pub fn validate_config(cfg: &AppConfig) -> Result<(), ConfigError> {
    let sim = &cfg.sales_simulation;
    if sim.min_sales_per_day > sim.max_sales_per_day {
        return Err(ConfigError::SalesBoundsInverted {
            min: sim.min_sales_per_day,
            max: sim.max_sales_per_day,
        });
    }
    for (&dow, &mult) in &sim.dow_multipliers {
        if dow > 6 {
            return Err(ConfigError::WeekdayOutOfRange(dow));
        }
        if !mult.is_finite() || mult < 0.0 {
            return Err(ConfigError::InvalidMultiplier(dow));
        }
    }
    if let Some(ceiling) = sim.max_affordable_price {
        if ceiling < Decimal::ZERO {
            return Err(ConfigError::NegativePriceCeiling);
        }
    }
    for (category, &amount) in &cfg.operating_expenses {
        if amount < Decimal::ZERO {
            return Err(ConfigError::NegativeExpense(category.clone()));
        }
    }
    Ok(())
}

impl Inventory {
    /// Empty inventory.
    pub fn new() -> Self {
        Inventory::default()
    }

    /// Insert or replace an item slot.
    pub fn insert(&mut self, name: &str, item: Item) {
        self.items.insert(name.to_string(), item);
    }

    /// Look up an item by name.
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    /// Iterate slots in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Item)> {
        self.items.iter()
    }

    /// Number of item slots.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no slots exist.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current sell price per item.
    pub fn prices(&self) -> BTreeMap<String, Decimal> {
        self.items
            .iter()
            .map(|(name, item)| (name.clone(), item.sell_price))
            .collect()
    }

    /// Cost price of a single item.
    pub fn cost_price(&self, item: &str) -> Result<Decimal, LedgerError> {
        self.items
            .get(item)
            .map(|it| it.cost_price)
            .ok_or_else(|| LedgerError::UnknownItem(item.to_string()))
    }

    /// Place a supplier order for `qty` units of `item`.
    ///
    /// A second order while one is pending accumulates quantity but keeps
    /// the first order's ETA — a later order never delays an earlier one.
    pub fn place_order(
        &mut self,
        item: &str,
        qty: u32,
        today: NaiveDate,
        min_qty: u32,
        lead_time_days: u32,
    ) -> Result<OrderReceipt, LedgerError> {
        let slot = self
            .items
            .get_mut(item)
            .ok_or_else(|| LedgerError::UnknownItem(item.to_string()))?;
        if qty < min_qty {
            return Err(LedgerError::BelowMinimumOrder {
                requested: qty,
                min: min_qty,
            });
        }
        let eta = match slot.restock_eta {
            Some(existing) => {
                slot.restock_pending += qty;
                existing
            }
            None => {
                slot.restock_pending = qty;
                let eta = today + Duration::days(i64::from(lead_time_days));
                slot.restock_eta = Some(eta);
                eta
            }
        };
        tracing::debug!(item, qty, %eta, pending = slot.restock_pending, "order placed");
        Ok(OrderReceipt {
            item: item.to_string(),
            restock_pending: slot.restock_pending,
            restock_eta: eta,
        })
    }

    /// Move every pending order with `eta <= upto` into stock.
    ///
    /// Clears pending quantity and ETA together, preserving the item
    /// invariant. Idempotent: a second call with nothing newly due returns
    /// an empty list and mutates nothing.
    pub fn apply_restocks(&mut self, upto: NaiveDate) -> Vec<AppliedRestock> {
        let mut applied = Vec::new();
        for (name, item) in &mut self.items {
            let due = item.restock_pending > 0 && item.restock_eta.is_some_and(|eta| eta <= upto);
            if due {
                item.stock += item.restock_pending;
                applied.push(AppliedRestock {
                    item: name.clone(),
                    qty: item.restock_pending,
                });
                item.restock_pending = 0;
                item.restock_eta = None;
            }
        }
        if !applied.is_empty() {
            tracing::debug!(count = applied.len(), %upto, "restocks applied");
        }
        applied
    }

    /// Deduct `qty` units of `item`, refusing rather than going negative.
    ///
    /// Returns false for unknown items or insufficient stock.
    pub fn deduct_stock(&mut self, item: &str, qty: u32) -> bool {
        match self.items.get_mut(item) {
            Some(slot) if slot.stock >= qty => {
                slot.stock -= qty;
                true
            }
            _ => false,
        }
    }

    /// Manually add units to stock, outside the restock pipeline.
    pub fn add_stock(&mut self, item: &str, qty: u32) -> Result<(), LedgerError> {
        let slot = self
            .items
            .get_mut(item)
            .ok_or_else(|| LedgerError::UnknownItem(item.to_string()))?;
        slot.stock += qty;
        Ok(())
    }

    /// Set the sell price of a single item; unknown items are an error.
    pub fn set_price(&mut self, item: &str, price: Decimal) -> Result<(), LedgerError> {
        let slot = self
            .items
            .get_mut(item)
            .ok_or_else(|| LedgerError::UnknownItem(item.to_string()))?;
        slot.sell_price = price;
        Ok(())
    }

    /// Bulk price update. Unknown keys are silently skipped.
    ///
    /// The asymmetry with [`Inventory::set_price`] is deliberate and kept
    /// as-is; callers relying on per-item validation use the single form.
    pub fn adjust_prices(&mut self, prices: &BTreeMap<String, Decimal>) {
        for (item, &price) in prices {
            if let Some(slot) = self.items.get_mut(item) {
                slot.sell_price = price;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn item(stock: u32, cost: Decimal, sell: Decimal) -> Item {
        Item {
            stock,
            restock_pending: 0,
            restock_eta: None,
            cost_price: cost,
            sell_price: sell,
        }
    }

    fn sample_inventory() -> Inventory {
        let mut inv = Inventory::new();
        inv.insert("Coke", item(20, Decimal::new(50, 2), Decimal::new(125, 2)));
        inv.insert("Chips", item(15, Decimal::new(30, 2), Decimal::new(100, 2)));
        inv
    }

    #[test]
    fn order_then_restock_round_trip() {
        let mut inv = sample_inventory();
        let receipt = inv.place_order("Coke", 12, d("2025-09-01"), 10, 2).unwrap();
        assert_eq!(receipt.restock_pending, 12);
        assert_eq!(receipt.restock_eta, d("2025-09-03"));
        let coke = inv.get("Coke").unwrap();
        assert_eq!(coke.stock, 20);
        assert_eq!(coke.restock_pending, 12);

        let applied = inv.apply_restocks(d("2025-09-03"));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].item, "Coke");
        assert_eq!(applied[0].qty, 12);
        let coke = inv.get("Coke").unwrap();
        assert_eq!(coke.stock, 32);
        assert_eq!(coke.restock_pending, 0);
        assert_eq!(coke.restock_eta, None);
    }

    #[test]
    fn restock_not_due_is_noop() {
        let mut inv = sample_inventory();
        inv.place_order("Coke", 12, d("2025-09-01"), 10, 2).unwrap();
        assert!(inv.apply_restocks(d("2025-09-02")).is_empty());
        assert_eq!(inv.get("Coke").unwrap().stock, 20);
        // Idempotent once applied.
        assert_eq!(inv.apply_restocks(d("2025-09-03")).len(), 1);
        assert!(inv.apply_restocks(d("2025-09-03")).is_empty());
    }

    #[test]
    fn below_minimum_order_rejected_without_mutation() {
        let mut inv = sample_inventory();
        let before = inv.clone();
        let err = inv
            .place_order("Coke", 5, d("2025-09-01"), 10, 2)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::BelowMinimumOrder {
                requested: 5,
                min: 10
            }
        );
        assert_eq!(inv, before);
    }

    #[test]
    fn order_for_unknown_item_rejected() {
        let mut inv = sample_inventory();
        let err = inv
            .place_order("Sushi", 10, d("2025-09-01"), 10, 2)
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownItem("Sushi".to_string()));
    }

    #[test]
    fn second_order_accumulates_and_keeps_first_eta() {
        let mut inv = sample_inventory();
        inv.place_order("Coke", 10, d("2025-09-01"), 10, 2).unwrap();
        let receipt = inv.place_order("Coke", 15, d("2025-09-02"), 10, 2).unwrap();
        assert_eq!(receipt.restock_pending, 25);
        assert_eq!(receipt.restock_eta, d("2025-09-03"));
    }

    #[test]
    fn deduct_refuses_to_go_negative() {
        let mut inv = sample_inventory();
        assert!(inv.deduct_stock("Chips", 15));
        assert_eq!(inv.get("Chips").unwrap().stock, 0);
        assert!(!inv.deduct_stock("Chips", 1));
        assert_eq!(inv.get("Chips").unwrap().stock, 0);
        assert!(!inv.deduct_stock("Sushi", 1));
    }

    #[test]
    fn price_validation_is_asymmetric() {
        let mut inv = sample_inventory();
        assert_eq!(
            inv.set_price("Sushi", Decimal::ONE),
            Err(LedgerError::UnknownItem("Sushi".to_string()))
        );

        let mut bulk = BTreeMap::new();
        bulk.insert("Coke".to_string(), Decimal::new(150, 2));
        bulk.insert("Sushi".to_string(), Decimal::new(999, 2));
        inv.adjust_prices(&bulk);
        assert_eq!(inv.get("Coke").unwrap().sell_price, Decimal::new(150, 2));
        assert!(inv.get("Sushi").is_none());
    }

    #[test]
    fn manual_stock_and_cost_lookups() {
        let mut inv = sample_inventory();
        inv.add_stock("Coke", 5).unwrap();
        assert_eq!(inv.get("Coke").unwrap().stock, 25);
        assert_eq!(
            inv.add_stock("Sushi", 5),
            Err(LedgerError::UnknownItem("Sushi".to_string()))
        );
        assert_eq!(inv.cost_price("Coke"), Ok(Decimal::new(50, 2)));
        assert!(inv.cost_price("Sushi").is_err());
        assert_eq!(inv.prices().len(), 2);
    }

    #[test]
    fn sales_helpers_filter_and_aggregate() {
        let sales = vec![
            SaleRecord::new(d("2025-09-01"), "Coke", 1, Decimal::new(125, 2), Decimal::new(50, 2)),
            SaleRecord::new(d("2025-09-02"), "Coke", 1, Decimal::new(125, 2), Decimal::new(50, 2)),
            SaleRecord::new(d("2025-09-01"), "Chips", 1, Decimal::new(100, 2), Decimal::new(30, 2)),
        ];
        assert_eq!(sales_for_date(&sales, d("2025-09-01")).len(), 2);
        let cogs = cogs_per_product(&sales);
        assert_eq!(cogs["Coke"], Decimal::new(100, 2));
        assert_eq!(cogs["Chips"], Decimal::new(30, 2));
    }

    #[test]
    fn inventory_serde_round_trip() {
        let mut inv = sample_inventory();
        inv.place_order("Coke", 10, d("2025-09-01"), 10, 2).unwrap();
        let s = serde_json::to_string_pretty(&inv).unwrap();
        let back: Inventory = serde_json::from_str(&s).unwrap();
        assert_eq!(back, inv);
    }

    fn sample_config() -> AppConfig {
        AppConfig {
            operating_expenses: BTreeMap::from([
                ("electricity".to_string(), Decimal::ONE),
                ("maintenance".to_string(), Decimal::ONE),
            ]),
            sales_simulation: SalesSimulation {
                min_sales_per_day: 5,
                max_sales_per_day: 20,
                dow_multipliers: BTreeMap::from([(4, 1.1), (6, 0.85)]),
                max_affordable_price: Some(Decimal::TWO),
            },
            supplier: SupplierConfig {
                lead_time_days: 2,
                min_order_qty: 10,
            },
            simulation: SimClock {
                running: true,
                current_date: d("2025-09-01"),
                last_simulated_date: None,
            },
            tick_seconds: 60,
        }
    }

    #[test]
    fn config_validates_and_round_trips() {
        let cfg = sample_config();
        validate_config(&cfg).unwrap();
        let s = serde_json::to_string(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn config_rejects_inverted_sales_bounds() {
        let mut cfg = sample_config();
        cfg.sales_simulation.min_sales_per_day = 30;
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::SalesBoundsInverted { min: 30, max: 20 })
        );
    }

    #[test]
    fn config_rejects_bad_multipliers_and_expenses() {
        let mut cfg = sample_config();
        cfg.sales_simulation.dow_multipliers.insert(7, 1.0);
        assert_eq!(validate_config(&cfg), Err(ConfigError::WeekdayOutOfRange(7)));

        let mut cfg = sample_config();
        cfg.sales_simulation.dow_multipliers.insert(2, -0.5);
        assert_eq!(validate_config(&cfg), Err(ConfigError::InvalidMultiplier(2)));

        let mut cfg = sample_config();
        cfg.operating_expenses
            .insert("rent".to_string(), Decimal::NEGATIVE_ONE);
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::NegativeExpense("rent".to_string()))
        );
    }

    #[test]
    fn missing_multiplier_defaults_to_one() {
        let cfg = sample_config();
        assert_eq!(cfg.sales_simulation.multiplier(Weekday::Fri), 1.1);
        assert_eq!(cfg.sales_simulation.multiplier(Weekday::Tue), 1.0);
    }

    proptest! {
        #[test]
        fn deduct_never_goes_negative(stock in 0u32..100, qty in 0u32..100) {
            let mut inv = Inventory::new();
            inv.insert("Water", item(stock, Decimal::new(20, 2), Decimal::ONE));
            let ok = inv.deduct_stock("Water", qty);
            let after = inv.get("Water").unwrap().stock;
            if ok {
                prop_assert_eq!(after, stock - qty);
            } else {
                prop_assert_eq!(after, stock);
                prop_assert!(qty > stock);
            }
        }

        #[test]
        fn pending_and_eta_stay_paired(qty in 10u32..500, lead in 0u32..30, extra in 10u32..500) {
            let mut inv = sample_inventory();
            let today = d("2025-09-01");
            inv.place_order("Coke", qty, today, 10, lead).unwrap();
            inv.place_order("Coke", extra, today + Duration::days(1), 10, lead).unwrap();
            let coke = inv.get("Coke").unwrap();
            prop_assert_eq!(coke.restock_pending, qty + extra);
            prop_assert_eq!(coke.restock_eta, Some(today + Duration::days(i64::from(lead))));

            let applied = inv.apply_restocks(today + Duration::days(i64::from(lead)));
            prop_assert_eq!(applied.len(), 1);
            let coke = inv.get("Coke").unwrap();
            prop_assert_eq!(coke.restock_pending, 0);
            prop_assert_eq!(coke.restock_eta, None);
            prop_assert_eq!(coke.stock, 20 + qty + extra);
        }
    }
}

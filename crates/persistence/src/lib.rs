#![deny(warnings)]

//! Persistence layer: JSON document store for ledgers and configuration.
//!
//! Each ledger lives in its own JSON document with get-all / replace-all
//! semantics; there is deliberately no cross-ledger transaction. Writes go
//! to a temp file and are moved into place with `rename`, and an interior
//! lock serializes individual read/write calls so interleaved operations
//! (price changes, manual orders) cannot lose updates mid-file.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use sim_core::{
    AppConfig, FinancialLedger, Inventory, Item, SalesLedger, SalesSimulation, SimClock,
    SupplierConfig,
};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Store access failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// A document exists but does not parse into its schema.
    #[error("malformed data file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persistence boundary used by the day simulator and the CLI.
///
/// Every method is a whole-document read or replace; callers own the
/// read-modify-write sequencing on top.
pub trait Store {
    /// Load the configuration document.
    fn load_config(&self) -> Result<AppConfig, StoreError>;
    /// Replace the configuration document.
    fn save_config(&self, cfg: &AppConfig) -> Result<(), StoreError>;
    /// Load the inventory ledger.
    fn load_inventory(&self) -> Result<Inventory, StoreError>;
    /// Replace the inventory ledger.
    fn save_inventory(&self, inv: &Inventory) -> Result<(), StoreError>;
    /// Load the sales ledger.
    fn load_sales(&self) -> Result<SalesLedger, StoreError>;
    /// Replace the sales ledger.
    fn save_sales(&self, sales: &SalesLedger) -> Result<(), StoreError>;
    /// Load the financial ledger.
    fn load_financials(&self) -> Result<FinancialLedger, StoreError>;
    /// Replace the financial ledger.
    fn save_financials(&self, fin: &FinancialLedger) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for &S {
    fn load_config(&self) -> Result<AppConfig, StoreError> {
        (**self).load_config()
    }
    fn save_config(&self, cfg: &AppConfig) -> Result<(), StoreError> {
        (**self).save_config(cfg)
    }
    fn load_inventory(&self) -> Result<Inventory, StoreError> {
        (**self).load_inventory()
    }
    fn save_inventory(&self, inv: &Inventory) -> Result<(), StoreError> {
        (**self).save_inventory(inv)
    }
    fn load_sales(&self) -> Result<SalesLedger, StoreError> {
        (**self).load_sales()
    }
    fn save_sales(&self, sales: &SalesLedger) -> Result<(), StoreError> {
        (**self).save_sales(sales)
    }
    fn load_financials(&self) -> Result<FinancialLedger, StoreError> {
        (**self).load_financials()
    }
    fn save_financials(&self, fin: &FinancialLedger) -> Result<(), StoreError> {
        (**self).save_financials(fin)
    }
}

const CONFIG_FILE: &str = "config.json";
const INVENTORY_FILE: &str = "inventory.json";
const SALES_FILE: &str = "sales.json";
const FINANCIALS_FILE: &str = "financials.json";

/// File-backed store, one JSON document per ledger in a data directory.
pub struct JsonStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Open (creating if needed) a data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(JsonStore {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_doc<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let _g = self.guard();
        let bytes = fs::read(self.dir.join(name))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_doc<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let _g = self.guard();
        let tmp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, self.dir.join(name))?;
        Ok(())
    }

    /// Seed any missing documents with the default dataset.
    ///
    /// Existing documents are left untouched, so this is safe to call on
    /// every startup.
    pub fn ensure_defaults(&self, start: NaiveDate) -> Result<(), StoreError> {
        if !self.dir.join(INVENTORY_FILE).exists() {
            self.write_doc(INVENTORY_FILE, &default_inventory())?;
        }
        if !self.dir.join(SALES_FILE).exists() {
            self.write_doc(SALES_FILE, &SalesLedger::new())?;
        }
        if !self.dir.join(FINANCIALS_FILE).exists() {
            self.write_doc(FINANCIALS_FILE, &FinancialLedger::new())?;
        }
        if !self.dir.join(CONFIG_FILE).exists() {
            self.write_doc(CONFIG_FILE, &default_config(start))?;
        }
        debug!(dir = %self.dir.display(), "data directory ready");
        Ok(())
    }
}

impl Store for JsonStore {
    fn load_config(&self) -> Result<AppConfig, StoreError> {
        self.read_doc(CONFIG_FILE)
    }
    fn save_config(&self, cfg: &AppConfig) -> Result<(), StoreError> {
        self.write_doc(CONFIG_FILE, cfg)
    }
    fn load_inventory(&self) -> Result<Inventory, StoreError> {
        self.read_doc(INVENTORY_FILE)
    }
    fn save_inventory(&self, inv: &Inventory) -> Result<(), StoreError> {
        self.write_doc(INVENTORY_FILE, inv)
    }
    fn load_sales(&self) -> Result<SalesLedger, StoreError> {
        self.read_doc(SALES_FILE)
    }
    fn save_sales(&self, sales: &SalesLedger) -> Result<(), StoreError> {
        self.write_doc(SALES_FILE, sales)
    }
    fn load_financials(&self) -> Result<FinancialLedger, StoreError> {
        self.read_doc(FINANCIALS_FILE)
    }
    fn save_financials(&self, fin: &FinancialLedger) -> Result<(), StoreError> {
        self.write_doc(FINANCIALS_FILE, fin)
    }
}

/// Starting machine load: four slots with supplier cost and shelf price.
pub fn default_inventory() -> Inventory {
    fn slot(stock: u32, cost_cents: i64, sell_cents: i64) -> Item {
        Item {
            stock,
            restock_pending: 0,
            restock_eta: None,
            cost_price: Decimal::new(cost_cents, 2),
            sell_price: Decimal::new(sell_cents, 2),
        }
    }
    let mut inv = Inventory::new();
    inv.insert("Coke", slot(20, 50, 125));
    inv.insert("Chips", slot(15, 30, 100));
    inv.insert("Water", slot(25, 20, 100));
    inv.insert("Candy", slot(18, 15, 85));
    inv
}

/// Default configuration with the clock set to `start`.
pub fn default_config(start: NaiveDate) -> AppConfig {
    AppConfig {
        operating_expenses: BTreeMap::from([
            ("electricity".to_string(), Decimal::ONE),
            ("maintenance".to_string(), Decimal::ONE),
        ]),
        sales_simulation: SalesSimulation {
            min_sales_per_day: 5,
            max_sales_per_day: 20,
            dow_multipliers: BTreeMap::from([
                (0, 1.0),
                (1, 1.0),
                (2, 1.05),
                (3, 1.05),
                (4, 1.1),
                (5, 0.9),
                (6, 0.85),
            ]),
            max_affordable_price: Some(Decimal::TWO),
        },
        supplier: SupplierConfig {
            lead_time_days: 2,
            min_order_qty: 10,
        },
        simulation: SimClock {
            running: true,
            current_date: start,
            last_simulated_date: None,
        },
        tick_seconds: 60,
    }
}

#[derive(Clone)]
struct MemoryState {
    config: AppConfig,
    inventory: Inventory,
    sales: SalesLedger,
    financials: FinancialLedger,
}

/// Lock-guarded in-memory store for tests and ephemeral runs.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Store seeded with a config and inventory and empty ledgers.
    pub fn new(config: AppConfig, inventory: Inventory) -> Self {
        MemoryStore {
            state: Mutex::new(MemoryState {
                config,
                inventory,
                sales: SalesLedger::new(),
                financials: FinancialLedger::new(),
            }),
        }
    }

    /// Store seeded with the default dataset.
    pub fn with_defaults(start: NaiveDate) -> Self {
        MemoryStore::new(default_config(start), default_inventory())
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn load_config(&self) -> Result<AppConfig, StoreError> {
        Ok(self.state().config.clone())
    }
    fn save_config(&self, cfg: &AppConfig) -> Result<(), StoreError> {
        self.state().config = cfg.clone();
        Ok(())
    }
    fn load_inventory(&self) -> Result<Inventory, StoreError> {
        Ok(self.state().inventory.clone())
    }
    fn save_inventory(&self, inv: &Inventory) -> Result<(), StoreError> {
        self.state().inventory = inv.clone();
        Ok(())
    }
    fn load_sales(&self) -> Result<SalesLedger, StoreError> {
        Ok(self.state().sales.clone())
    }
    fn save_sales(&self, sales: &SalesLedger) -> Result<(), StoreError> {
        self.state().sales = sales.clone();
        Ok(())
    }
    fn load_financials(&self) -> Result<FinancialLedger, StoreError> {
        Ok(self.state().financials.clone())
    }
    fn save_financials(&self, fin: &FinancialLedger) -> Result<(), StoreError> {
        self.state().financials = fin.clone();
        Ok(())
    }
}

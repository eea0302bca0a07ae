#![deny(warnings)]

//! Headless CLI for running and inspecting the vending-machine simulation.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use persistence::{JsonStore, Store};
use rust_decimal::Decimal;
use sim_core::sales_for_date;
use sim_econ::{aggregate_profitability, latest_day};
use sim_runtime::{DaySimulator, DaySummary};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    data_dir: PathBuf,
    seed: u64,
    days: u32,
    watch: bool,
    status: bool,
    prices: bool,
    summary: bool,
    sales: Option<Option<NaiveDate>>,
    order: Option<(String, u32)>,
    set_price: Option<(String, Decimal)>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        data_dir: PathBuf::from("./data"),
        seed: 42,
        days: 0,
        watch: false,
        status: false,
        prices: false,
        summary: false,
        sales: None,
        order: None,
        set_price: None,
    };
    let mut it = std::env::args().skip(1).peekable();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--data-dir" => {
                args.data_dir = it.next().context("--data-dir needs a path")?.into();
            }
            "--seed" => {
                let v = it.next().context("--seed needs a number")?;
                args.seed = v.parse().with_context(|| format!("bad seed: {v}"))?;
            }
            "--days" => {
                let v = it.next().context("--days needs a count")?;
                args.days = v.parse().with_context(|| format!("bad day count: {v}"))?;
            }
            "--watch" => args.watch = true,
            "--status" => args.status = true,
            "--prices" => args.prices = true,
            "--summary" => args.summary = true,
            "--sales" => {
                let date = match it.peek() {
                    Some(next) if !next.starts_with("--") => {
                        let v = it.next().unwrap_or_default();
                        Some(v.parse().with_context(|| format!("bad date: {v}"))?)
                    }
                    _ => None,
                };
                args.sales = Some(date);
            }
            "--order" => {
                let v = it.next().context("--order needs ITEM=QTY")?;
                let (item, qty) = v.split_once('=').context("--order needs ITEM=QTY")?;
                let qty: u32 = qty.parse().with_context(|| format!("bad quantity: {qty}"))?;
                if qty == 0 {
                    bail!("order quantity must be positive");
                }
                args.order = Some((item.to_string(), qty));
            }
            "--set-price" => {
                let v = it.next().context("--set-price needs ITEM=PRICE")?;
                let (item, price) = v.split_once('=').context("--set-price needs ITEM=PRICE")?;
                let price: Decimal = price.parse().with_context(|| format!("bad price: {price}"))?;
                if price < Decimal::ZERO {
                    bail!("price must be non-negative");
                }
                args.set_price = Some((item.to_string(), price));
            }
            _ => {}
        }
    }
    Ok(args)
}

fn print_day(s: &DaySummary) {
    println!(
        "{} | sold: {} | revenue: ${} | cogs: ${} | expenses: ${} | profit: ${} | restocks: {}",
        s.date, s.sales_count, s.revenue, s.cogs, s.expenses, s.profit, s.restocks_applied.len()
    );
}

fn place_order(store: &JsonStore, item: &str, qty: u32) -> Result<()> {
    let cfg = store.load_config()?;
    let mut inv = store.load_inventory()?;
    let receipt = inv.place_order(
        item,
        qty,
        cfg.simulation.current_date,
        cfg.supplier.min_order_qty,
        cfg.supplier.lead_time_days,
    )?;
    store.save_inventory(&inv)?;
    println!(
        "Order placed | {} | pending: {} | eta: {}",
        receipt.item, receipt.restock_pending, receipt.restock_eta
    );
    Ok(())
}

fn set_price(store: &JsonStore, item: &str, price: Decimal) -> Result<()> {
    let mut inv = store.load_inventory()?;
    inv.set_price(item, price)?;
    store.save_inventory(&inv)?;
    println!("Price updated | {item} | ${price}");
    Ok(())
}

fn print_sales(store: &JsonStore, date: Option<NaiveDate>) -> Result<()> {
    let day = match date {
        Some(d) => Some(d),
        None => {
            let cfg = store.load_config()?;
            let fin = store.load_financials()?;
            cfg.simulation.last_simulated_date.or_else(|| latest_day(&fin))
        }
    };
    let Some(day) = day else {
        println!("No simulated days yet.");
        return Ok(());
    };
    let sales = store.load_sales()?;
    let records = sales_for_date(&sales, day);
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Interval scheduler: one day transition per tick while the config's
/// `running` flag stays set.
fn run_watch(store: &JsonStore, seed: u64) -> Result<()> {
    let mut sim = DaySimulator::seeded(store, seed);
    loop {
        let cfg = store.load_config()?;
        if !cfg.simulation.running {
            info!("simulation paused; leaving watch loop");
            return Ok(());
        }
        print_day(&sim.simulate_day()?);
        thread::sleep(Duration::from_secs(cfg.tick_seconds));
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!(data_dir = %args.data_dir.display(), seed = args.seed, "starting vendsim");

    let store = JsonStore::open(&args.data_dir)?;
    store.ensure_defaults(chrono::Local::now().date_naive())?;

    if let Some((item, qty)) = &args.order {
        place_order(&store, item, *qty)?;
    }
    if let Some((item, price)) = &args.set_price {
        set_price(&store, item, *price)?;
    }

    if args.days > 0 {
        let mut sim = DaySimulator::seeded(&store, args.seed);
        for summary in sim.run_days(args.days)? {
            print_day(&summary);
        }
    }
    if args.watch {
        run_watch(&store, args.seed)?;
    }

    if args.status {
        let cfg = store.load_config()?;
        println!("{}", serde_json::to_string_pretty(&cfg.simulation)?);
        println!("tick_seconds: {}", cfg.tick_seconds);
    }
    if args.prices {
        for (item, price) in store.load_inventory()?.prices() {
            println!("{item}: ${price}");
        }
    }
    if let Some(date) = args.sales {
        print_sales(&store, date)?;
    }
    if args.summary {
        let summary = aggregate_profitability(&store.load_financials()?);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

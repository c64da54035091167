//! change-engine CLI
//!
//! Give change from the command line, with or without a stock ledger.
//!
//! # Usage
//!
//! ```bash
//! # Pure decomposition
//! change-engine change --currency EUR --amount 376
//!
//! # Debit the persisted stock
//! change-engine change --currency EUR --amount 376 --mode limited --format json
//!
//! # Inspect and replenish stock
//! change-engine stock --currency EUR
//! change-engine restock --currency USD --set 10000=5 --set 5000=5 ...
//! ```

use change_engine::config::{parse_timeout_ms, EngineConfig};
use change_engine::core::catalog::CurrencyCatalog;
use change_engine::core::stock::StockLevels;
use change_engine::engine::change::{ChangeEngine, ChangeError, ChangeMode, ErrorKind};
use change_engine::ledger::{JsonFileStore, StockLedger};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

const EXIT_USAGE: i32 = 1;
const EXIT_VALIDATION: i32 = 2;
const EXIT_INFEASIBLE: i32 = 3;
const EXIT_LEDGER: i32 = 4;

fn print_usage() {
    eprintln!(
        r#"change-engine — give change in a currency's denominations

USAGE:
    change-engine <COMMAND> [OPTIONS]

COMMANDS:
    change      Break an amount into denominations
    stock       Show the stock held for a currency
    restock     Replace the stock held for a currency
    currencies  List the currencies in the catalog
    help        Show this message

OPTIONS (change):
    --currency <CODE>     Currency code, e.g. EUR
    --amount <N>          Amount in minor units (cents, pence, ...)
    --mode <MODE>         unlimited (default) or limited

OPTIONS (stock, restock):
    --currency <CODE>     Currency code
    --set <DENOM>=<N>     (restock) count for one denomination; repeat for each

COMMON OPTIONS:
    --format <FORMAT>     Output format: text (default) or json
    --catalog <FILE>      Currency catalog JSON (default: built-in)
    --stock-dir <DIR>     Stock ledger directory (default: ./stock)
    --lock-timeout-ms <N> Wait at most N ms for the stock lock

ENVIRONMENT:
    CHANGE_ENGINE_CATALOG, CHANGE_ENGINE_STOCK_DIR,
    CHANGE_ENGINE_LOCK_TIMEOUT_MS, CHANGE_ENGINE_INITIAL_STOCK,
    RUST_LOG (default: warn)

EXIT CODES:
    1 usage or configuration error, 2 invalid input,
    3 exact change impossible, 4 stock ledger failure

EXAMPLES:
    change-engine change --currency EUR --amount 376
    change-engine change --currency EUR --amount 376 --mode limited --format json
    change-engine stock --currency EUR
    change-engine restock --currency GBP --set 5000=10 --set 2000=10 ..."#
    );
}

fn fail(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(code);
}

/// Options shared by every command.
struct CommonArgs {
    config: EngineConfig,
    json: bool,
}

impl CommonArgs {
    fn from_env() -> Self {
        let config = EngineConfig::from_env().unwrap_or_else(|e| fail(EXIT_USAGE, e));
        Self {
            config,
            json: false,
        }
    }

    /// Consume a common option at `args[*i]`; returns false if it is not one.
    fn take(&mut self, args: &[String], i: &mut usize) -> bool {
        let flag = args[*i].as_str();
        let known = matches!(
            flag,
            "--format" | "--catalog" | "--stock-dir" | "--lock-timeout-ms"
        );
        if !known {
            return false;
        }
        *i += 1;
        let value = args
            .get(*i)
            .cloned()
            .unwrap_or_else(|| fail(EXIT_USAGE, format!("{} requires a value", flag)));
        match flag {
            "--format" => match value.as_str() {
                "text" => self.json = false,
                "json" => self.json = true,
                other => fail(EXIT_USAGE, format!("unknown format '{}'", other)),
            },
            "--catalog" => self.config.catalog_path = Some(PathBuf::from(value)),
            "--stock-dir" => self.config.stock_dir = PathBuf::from(value),
            _ => {
                self.config.ledger.lock_timeout =
                    parse_timeout_ms(flag, &value).unwrap_or_else(|e| fail(EXIT_USAGE, e));
            }
        }
        true
    }

    fn catalog(&self) -> CurrencyCatalog {
        match &self.config.catalog_path {
            Some(path) => CurrencyCatalog::load(path).unwrap_or_else(|e| fail(EXIT_USAGE, e)),
            None => CurrencyCatalog::builtin(),
        }
    }

    fn engine(&self) -> ChangeEngine<JsonFileStore> {
        let store = JsonFileStore::open(&self.config.stock_dir).unwrap_or_else(|e| {
            fail(
                EXIT_LEDGER,
                format!(
                    "cannot open stock directory '{}': {}",
                    self.config.stock_dir.display(),
                    e
                ),
            )
        });
        let ledger = StockLedger::new(store, self.config.ledger.clone());
        ChangeEngine::new(Arc::new(self.catalog()), ledger)
    }
}

fn exit_code(err: &ChangeError) -> i32 {
    match err.kind() {
        ErrorKind::Validation => EXIT_VALIDATION,
        ErrorKind::Infeasible => EXIT_INFEASIBLE,
        ErrorKind::Ledger => EXIT_LEDGER,
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(EXIT_USAGE, e),
    }
}

fn print_stock(currency: &str, stock: &StockLevels) {
    println!("Stock for {}:", currency);
    print!("{}", stock);
    println!("Total value: {}", stock.total_value());
}

fn required(value: Option<String>, flag: &str) -> String {
    value.unwrap_or_else(|| fail(EXIT_USAGE, format!("{} is required", flag)))
}

fn next_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    args.get(*i)
        .cloned()
        .unwrap_or_else(|| fail(EXIT_USAGE, format!("{} requires a value", flag)))
}

fn cmd_change(args: &[String]) {
    let mut common = CommonArgs::from_env();
    let mut currency = None;
    let mut amount = None;
    let mut mode = ChangeMode::Unlimited.to_string();
    let mut i = 0;
    while i < args.len() {
        if !common.take(args, &mut i) {
            match args[i].as_str() {
                "--currency" => currency = Some(next_value(args, &mut i, "--currency")),
                "--amount" => amount = Some(next_value(args, &mut i, "--amount")),
                "--mode" => mode = next_value(args, &mut i, "--mode"),
                other => fail(EXIT_USAGE, format!("unknown option: {}", other)),
            }
        }
        i += 1;
    }
    let currency = required(currency, "--currency");
    let amount = required(amount, "--amount");

    let engine = common.engine();
    match engine.compute_change_raw(&currency, &amount, &mode) {
        Ok(receipt) if common.json => print_json(&receipt),
        Ok(receipt) => {
            println!(
                "Change for {} {} ({}):",
                receipt.amount, receipt.currency, receipt.mode
            );
            print!("{}", receipt.breakdown);
            println!("Units: {}", receipt.breakdown.pieces());
            if let Some(stock) = &receipt.stock_after {
                println!();
                print_stock(receipt.currency.as_str(), stock);
            }
        }
        Err(e) => fail(exit_code(&e), e),
    }
}

fn cmd_stock(args: &[String]) {
    let mut common = CommonArgs::from_env();
    let mut currency = None;
    let mut i = 0;
    while i < args.len() {
        if !common.take(args, &mut i) {
            match args[i].as_str() {
                "--currency" => currency = Some(next_value(args, &mut i, "--currency")),
                other => fail(EXIT_USAGE, format!("unknown option: {}", other)),
            }
        }
        i += 1;
    }
    let currency = required(currency, "--currency");

    let engine = common.engine();
    match engine.stock(&currency) {
        Ok(stock) if common.json => print_json(&stock),
        Ok(stock) => print_stock(&currency.to_ascii_uppercase(), &stock),
        Err(e) => fail(exit_code(&e), e),
    }
}

fn cmd_restock(args: &[String]) {
    let mut common = CommonArgs::from_env();
    let mut currency = None;
    let mut counts = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if !common.take(args, &mut i) {
            match args[i].as_str() {
                "--currency" => currency = Some(next_value(args, &mut i, "--currency")),
                "--set" => {
                    let pair = next_value(args, &mut i, "--set");
                    let (denomination, count) = pair.split_once('=').unwrap_or_else(|| {
                        fail(EXIT_USAGE, format!("--set expects DENOM=COUNT, got '{}'", pair))
                    });
                    counts.push((denomination.to_string(), count.to_string()));
                }
                other => fail(EXIT_USAGE, format!("unknown option: {}", other)),
            }
        }
        i += 1;
    }
    let currency = required(currency, "--currency");

    let engine = common.engine();
    match engine.restock(&currency, &counts) {
        Ok(stock) if common.json => print_json(&stock),
        Ok(stock) => {
            println!("Stock for {} updated.", currency.to_ascii_uppercase());
            print_stock(&currency.to_ascii_uppercase(), &stock);
        }
        Err(e) => fail(exit_code(&e), e),
    }
}

fn cmd_currencies(args: &[String]) {
    let mut common = CommonArgs::from_env();
    let mut i = 0;
    while i < args.len() {
        if !common.take(args, &mut i) {
            fail(EXIT_USAGE, format!("unknown option: {}", args[i]));
        }
        i += 1;
    }

    let catalog = common.catalog();
    if common.json {
        let currencies: Vec<_> = catalog.currencies().collect();
        print_json(&currencies);
    } else {
        for currency in catalog.currencies() {
            let denominations: Vec<String> = currency
                .denominations()
                .iter()
                .map(|d| d.to_string())
                .collect();
            println!("{}  [{}]", currency, denominations.join(", "));
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(EXIT_USAGE);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "change" => cmd_change(rest),
        "stock" => cmd_stock(rest),
        "restock" => cmd_restock(rest),
        "currencies" => cmd_currencies(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(EXIT_USAGE);
        }
    }
}

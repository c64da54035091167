//! Limited-stock example.
//!
//! Pays change out of a persisted stock ledger until a denomination runs
//! dry, then restocks it.

use change_engine::prelude::*;
use std::sync::Arc;
use std::thread;

fn main() {
    println!("╔═══════════════════════════════════════════╗");
    println!("║  change-engine: Limited Stock Example     ║");
    println!("╚═══════════════════════════════════════════╝\n");

    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("cannot create a stock directory: {}", e);
            return;
        }
    };
    let store = match JsonFileStore::open(dir.path()) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("cannot open stock directory: {}", e);
            return;
        }
    };
    println!("Stock directory: {}\n", dir.path().display());

    let engine = Arc::new(ChangeEngine::new(
        Arc::new(CurrencyCatalog::builtin()),
        StockLedger::new(store, LedgerConfig::default()),
    ));

    // --- Scenario 1: a small till ---
    println!("━━━ Scenario 1: Restock a Small Till ━━━\n");

    let till: Vec<(String, String)> = [
        ("10000", "0"),
        ("5000", "1"),
        ("2000", "2"),
        ("1000", "2"),
        ("500", "2"),
        ("200", "0"),
        ("100", "5"),
        ("25", "4"),
        ("10", "5"),
        ("5", "5"),
        ("1", "10"),
    ]
    .iter()
    .map(|(d, n)| (d.to_string(), n.to_string()))
    .collect();

    match engine.restock("USD", &till) {
        Ok(stock) => {
            print!("{}", stock);
            println!("Total value: {}\n", stock.total_value());
        }
        Err(e) => {
            eprintln!("restock failed: {}", e);
            return;
        }
    }

    // --- Scenario 2: pay until the till can't ---
    println!("━━━ Scenario 2: Pay Out ━━━\n");

    for amount in ["4141", "3000", "2000", "999"] {
        match engine.compute_change_raw("USD", amount, "limited") {
            Ok(receipt) => {
                println!("{} USD paid:", amount);
                print!("{}", receipt.breakdown);
                if let Some(id) = receipt.transaction_id {
                    println!("  transaction {}", id);
                }
                println!();
            }
            Err(e) => println!("{} USD refused: {}\n", amount, e),
        }
    }

    // --- Scenario 3: concurrent tellers ---
    println!("━━━ Scenario 3: Concurrent Tellers ━━━\n");

    let tellers: Vec<_> = (0..4)
        .map(|teller| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let outcome = engine.compute_change_raw("USD", "25", "limited");
                (teller, outcome.is_ok())
            })
        })
        .collect();

    for handle in tellers {
        if let Ok((teller, paid)) = handle.join() {
            println!("  teller {}: {}", teller, if paid { "paid" } else { "refused" });
        }
    }

    match engine.stock("USD") {
        Ok(stock) => {
            println!("\nStock left:");
            print!("{}", stock);
        }
        Err(e) => eprintln!("cannot read stock: {}", e),
    }
}

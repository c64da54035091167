//! Basic change-making example.
//!
//! Breaks amounts into the built-in currencies' denominations with an
//! unbounded supply, and shows where greedy falls short.

use change_engine::prelude::*;
use std::sync::Arc;

fn main() {
    println!("╔═══════════════════════════════════════════╗");
    println!("║  change-engine: Basic Change Example      ║");
    println!("╚═══════════════════════════════════════════╝\n");

    let catalog = Arc::new(CurrencyCatalog::builtin());
    let engine = ChangeEngine::new(
        Arc::clone(&catalog),
        StockLedger::new(MemoryStore::new(), LedgerConfig::default()),
    );

    // --- Scenario 1: canonical coin sets ---
    println!("━━━ Scenario 1: Unlimited Change ━━━\n");

    for (currency, amount) in [("EUR", "376"), ("USD", "4199"), ("GBP", "1234"), ("JPY", "18888")] {
        match engine.compute_change_raw(currency, amount, "unlimited") {
            Ok(receipt) => {
                println!("{} {}:", receipt.amount, receipt.currency);
                print!("{}", receipt.breakdown);
                println!("  ({} unit(s))\n", receipt.breakdown.pieces());
            }
            Err(e) => println!("{} {}: {}\n", amount, currency, e),
        }
    }

    // --- Scenario 2: amounts beyond 64 bits ---
    println!("━━━ Scenario 2: Arbitrary Precision ━━━\n");

    let huge = "123456789012345678901234567890";
    if let Ok(receipt) = engine.compute_change_raw("EUR", huge, "unlimited") {
        println!("{} EUR needs {} unit(s)", huge, receipt.breakdown.pieces());
        println!("Breakdown total: {}\n", receipt.breakdown.total());
    }

    // --- Scenario 3: a non-canonical set ---
    println!("━━━ Scenario 3: Greedy Limitation ━━━\n");

    let odd = Currency::new(
        CurrencyCode::new("ODD"),
        "o",
        "Odd Coins",
        vec![Amount::from(4u64), Amount::from(3u64)],
    );
    let Ok(odd) = odd else {
        return;
    };
    let amount = Amount::from(6u64);
    if let Ok(result) = GreedyDecomposer::unlimited(&amount, odd.denominations()) {
        println!("{} over [4, 3]:", amount);
        print!("{}", result.breakdown);
        println!(
            "  remainder {} (3 + 3 would have worked; greedy takes 4 first)",
            result.remainder
        );
    }
}

//! The persistent stock ledger behind limited-stock change.
//!
//! - **store** — the [`LedgerStore`] seam and an in-memory store
//! - **file_store** — durable JSON store with advisory file locks and atomic replace
//! - **lock** — per-currency lock table with acquisition timeout
//! - **stock_ledger** — load, transact and restock on top of a store

pub mod error;
pub mod file_store;
pub mod lock;
pub mod stock_ledger;
pub mod store;

pub use error::LedgerError;
pub use file_store::JsonFileStore;
pub use stock_ledger::{LedgerTransaction, StockLedger};
pub use store::{LedgerStore, MemoryStore};

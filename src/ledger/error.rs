use crate::core::currency::CurrencyCode;
use crate::engine::greedy::DenominationError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures of the stock ledger.
///
/// None of these imply that change could not be made: a commit can fail
/// after a successful decomposition. Callers report them separately from
/// an infeasible amount.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{currency}: stock is locked by another transaction (waited {waited:?})")]
    LockTimeout {
        currency: CurrencyCode,
        waited: Duration,
    },
    #[error("{currency}: cannot acquire stock lock {path}: {source}")]
    Lock {
        currency: CurrencyCode,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{currency}: cannot read stock: {source}")]
    Read {
        currency: CurrencyCode,
        #[source]
        source: std::io::Error,
    },
    #[error("{currency}: stock ledger is corrupt: {reason}")]
    Corrupt {
        currency: CurrencyCode,
        reason: String,
    },
    /// The new stock could not be written; the previous record is intact.
    #[error("{currency}: stock could not be committed, previous record kept: {source}")]
    CommitFailed {
        currency: CurrencyCode,
        #[source]
        source: std::io::Error,
    },
    #[error("{currency}: no stock record and the initial stock could not be written: {source}")]
    SeedFailed {
        currency: CurrencyCode,
        #[source]
        source: std::io::Error,
    },
    #[error("{currency}: new stock does not match the currency: {drift}")]
    StockMismatch { currency: CurrencyCode, drift: String },
    #[error("invalid denominations: {0}")]
    Denominations(#[from] DenominationError),
}

impl LedgerError {
    /// Whether retrying the whole transaction later may succeed without
    /// anyone repairing data first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::LockTimeout { .. }
                | LedgerError::Lock { .. }
                | LedgerError::Read { .. }
                | LedgerError::CommitFailed { .. }
                | LedgerError::SeedFailed { .. }
        )
    }
}

use crate::core::amount::{Amount, AmountError};
use crate::core::catalog::CurrencyCatalog;
use crate::core::currency::{Currency, CurrencyCode};
use crate::core::stock::StockLevels;
use crate::engine::greedy::{Breakdown, DenominationError, GreedyDecomposer};
use crate::ledger::{LedgerError, LedgerStore, StockLedger};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Where the units handed out come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMode {
    /// Any number of units of every denomination; the ledger is not used.
    Unlimited,
    /// Units come out of, and are debited from, the stock ledger.
    Limited,
}

impl FromStr for ChangeMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unlimited" | "infinite" => Ok(Self::Unlimited),
            "limited" | "stock" => Ok(Self::Limited),
            _ => Err(ValidationError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for ChangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::Limited => write!(f, "limited"),
        }
    }
}

/// Bad input. Fixable by the caller; never touches the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown currency {0:?}")]
    UnknownCurrency(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("unknown mode {0:?}, expected \"unlimited\" or \"limited\"")]
    UnknownMode(String),
    #[error("{currency} has no {denomination} denomination")]
    UnknownDenomination {
        currency: CurrencyCode,
        denomination: Amount,
    },
    #[error("no count given for the {denomination} denomination of {currency}")]
    MissingDenomination {
        currency: CurrencyCode,
        denomination: Amount,
    },
    #[error("invalid denominations: {0}")]
    Denominations(#[from] DenominationError),
}

/// Broad class of a [`ChangeError`], for callers that only need to decide
/// between "fix the input", "try another amount" and "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Infeasible,
    Ledger,
}

/// Everything `compute_change` can fail with.
#[derive(Debug, Error)]
pub enum ChangeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot give exact change for {amount} {currency} in {mode} mode, {remainder} left over")]
    Infeasible {
        currency: CurrencyCode,
        amount: Amount,
        mode: ChangeMode,
        remainder: Amount,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ChangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Infeasible { .. } => ErrorKind::Infeasible,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

/// Raw, unvalidated request fields as they arrive from a form or CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeRequest {
    pub currency: String,
    pub amount: String,
    pub mode: String,
}

impl ChangeRequest {
    pub fn new(
        currency: impl Into<String>,
        amount: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            currency: currency.into(),
            amount: amount.into(),
            mode: mode.into(),
        }
    }

    /// Validate against `catalog`.
    pub fn parse(&self, catalog: &CurrencyCatalog) -> Result<DecompositionRequest, ValidationError> {
        let currency = catalog
            .get(&self.currency)
            .ok_or_else(|| ValidationError::UnknownCurrency(self.currency.clone()))?;
        let amount = Amount::parse(self.amount.trim())?;
        if amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount);
        }
        let mode = self.mode.parse()?;
        Ok(DecompositionRequest {
            currency: currency.code().clone(),
            amount,
            mode,
        })
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionRequest {
    pub currency: CurrencyCode,
    pub amount: Amount,
    pub mode: ChangeMode,
}

/// Successful change.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReceipt {
    pub currency: CurrencyCode,
    pub amount: Amount,
    pub mode: ChangeMode,
    pub breakdown: Breakdown,
    /// Stock after the debit; only in limited mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_after: Option<StockLevels>,
    /// Ledger transaction that committed the debit; only in limited mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
}

/// Entry point for callers: validates input, runs the decomposition and,
/// in limited mode, commits it against the stock ledger.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use change_engine::prelude::*;
///
/// let catalog = Arc::new(CurrencyCatalog::builtin());
/// let ledger = StockLedger::new(MemoryStore::new(), LedgerConfig::default());
/// let engine = ChangeEngine::new(catalog, ledger);
///
/// let receipt = engine.compute_change_raw("EUR", "376", "unlimited").unwrap();
/// assert_eq!(receipt.breakdown.coins().len(), 6);
/// ```
#[derive(Debug)]
pub struct ChangeEngine<S: LedgerStore> {
    catalog: Arc<CurrencyCatalog>,
    ledger: StockLedger<S>,
}

impl<S: LedgerStore> ChangeEngine<S> {
    pub fn new(catalog: Arc<CurrencyCatalog>, ledger: StockLedger<S>) -> Self {
        Self { catalog, ledger }
    }

    pub fn catalog(&self) -> &CurrencyCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &StockLedger<S> {
        &self.ledger
    }

    /// Validate raw strings and compute change.
    pub fn compute_change_raw(
        &self,
        currency: &str,
        amount: &str,
        mode: &str,
    ) -> Result<ChangeReceipt, ChangeError> {
        let request = ChangeRequest::new(currency, amount, mode).parse(&self.catalog)?;
        self.compute_change(&request)
    }

    /// Compute change for a validated request.
    ///
    /// Unlimited mode is pure arithmetic. Limited mode is a single ledger
    /// transaction: either the full breakdown is debited or nothing is.
    pub fn compute_change(&self, request: &DecompositionRequest) -> Result<ChangeReceipt, ChangeError> {
        let currency = self.currency(request.currency.as_str())?;
        if request.amount.is_zero() {
            return Err(ValidationError::NonPositiveAmount.into());
        }

        match request.mode {
            ChangeMode::Unlimited => {
                let decomposition =
                    GreedyDecomposer::unlimited(&request.amount, currency.denominations())
                        .map_err(ValidationError::from)?;
                if !decomposition.is_exact() {
                    return Err(infeasible(request, decomposition.remainder));
                }
                log::debug!(
                    "{}: change for {} without stock, {} unit(s)",
                    currency.code(),
                    request.amount,
                    decomposition.breakdown.pieces()
                );
                Ok(ChangeReceipt {
                    currency: currency.code().clone(),
                    amount: request.amount.clone(),
                    mode: request.mode,
                    breakdown: decomposition.breakdown,
                    stock_after: None,
                    transaction_id: None,
                })
            }
            ChangeMode::Limited => {
                let tx = self.ledger.transact(currency, &request.amount)?;
                if !tx.feasible {
                    return Err(infeasible(request, tx.remainder));
                }
                Ok(ChangeReceipt {
                    currency: currency.code().clone(),
                    amount: request.amount.clone(),
                    mode: request.mode,
                    breakdown: tx.breakdown,
                    stock_after: Some(tx.stock),
                    transaction_id: Some(tx.id),
                })
            }
        }
    }

    /// Current stock of `currency`, seeding it on first use.
    pub fn stock(&self, currency: &str) -> Result<StockLevels, ChangeError> {
        let currency = self.currency(currency)?;
        Ok(self.ledger.load(currency)?)
    }

    /// Set the stock of every denomination of `currency` from raw
    /// `(denomination, count)` strings. All denominations must be given.
    pub fn restock(
        &self,
        currency: &str,
        counts: &[(String, String)],
    ) -> Result<StockLevels, ChangeError> {
        let currency = self.currency(currency)?;
        let levels = parse_restock(currency, counts)?;
        Ok(self.ledger.restock(currency, levels)?)
    }

    fn currency(&self, code: &str) -> Result<&Currency, ValidationError> {
        self.catalog
            .get(code)
            .ok_or_else(|| ValidationError::UnknownCurrency(code.to_string()))
    }
}

fn infeasible(request: &DecompositionRequest, remainder: Amount) -> ChangeError {
    ChangeError::Infeasible {
        currency: request.currency.clone(),
        amount: request.amount.clone(),
        mode: request.mode,
        remainder,
    }
}

fn parse_restock(
    currency: &Currency,
    counts: &[(String, String)],
) -> Result<StockLevels, ValidationError> {
    let mut levels = StockLevels::new();
    for (denomination, count) in counts {
        let denomination = Amount::parse(denomination.trim())?;
        if !currency.has_denomination(&denomination) {
            return Err(ValidationError::UnknownDenomination {
                currency: currency.code().clone(),
                denomination,
            });
        }
        levels.set(denomination, Amount::parse(count.trim())?);
    }
    if let Some(missing) = currency
        .denominations()
        .iter()
        .find(|d| levels.iter().all(|(held, _)| held != *d))
    {
        return Err(ValidationError::MissingDenomination {
            currency: currency.code().clone(),
            denomination: missing.clone(),
        });
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::MemoryStore;

    fn engine() -> ChangeEngine<MemoryStore> {
        ChangeEngine::new(
            Arc::new(CurrencyCatalog::builtin()),
            StockLedger::new(MemoryStore::new(), LedgerConfig::default()),
        )
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("unlimited".parse::<ChangeMode>().unwrap(), ChangeMode::Unlimited);
        assert_eq!("Infinite".parse::<ChangeMode>().unwrap(), ChangeMode::Unlimited);
        assert_eq!("LIMITED".parse::<ChangeMode>().unwrap(), ChangeMode::Limited);
        assert_eq!(
            "maybe".parse::<ChangeMode>(),
            Err(ValidationError::UnknownMode("maybe".to_string()))
        );
    }

    #[test]
    fn test_request_validation() {
        let catalog = CurrencyCatalog::builtin();
        let err = ChangeRequest::new("XXX", "10", "unlimited").parse(&catalog).unwrap_err();
        assert_eq!(err, ValidationError::UnknownCurrency("XXX".to_string()));

        let err = ChangeRequest::new("EUR", "0", "unlimited").parse(&catalog).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveAmount);

        let err = ChangeRequest::new("EUR", "-10", "unlimited").parse(&catalog).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount(AmountError::Negative(_))));

        let err = ChangeRequest::new("EUR", "1.5", "unlimited").parse(&catalog).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount(AmountError::Malformed(_))));

        let request = ChangeRequest::new("eur", " 376 ", "limited").parse(&catalog).unwrap();
        assert_eq!(request.currency, CurrencyCode::new("EUR"));
        assert_eq!(request.amount, Amount::from(376u64));
        assert_eq!(request.mode, ChangeMode::Limited);
    }

    #[test]
    fn test_unlimited_does_not_touch_ledger() {
        let engine = engine();
        let receipt = engine.compute_change_raw("EUR", "376", "unlimited").unwrap();
        assert_eq!(receipt.breakdown.total(), Amount::from(376u64));
        assert!(receipt.stock_after.is_none());
        assert!(receipt.transaction_id.is_none());
        let eur = CurrencyCode::new("EUR");
        assert_eq!(engine.ledger().store().read(&eur).unwrap(), None);
    }

    #[test]
    fn test_limited_debits_stock() {
        let engine = engine();
        let receipt = engine.compute_change_raw("EUR", "376", "limited").unwrap();
        let stock = receipt.stock_after.unwrap();
        assert_eq!(stock.get(&Amount::from(200u64)), Amount::from(999_999_999u64));
        assert_eq!(stock.get(&Amount::from(10u64)), Amount::from(1_000_000_000u64));
        assert!(receipt.transaction_id.is_some());
    }

    #[test]
    fn test_error_kinds() {
        let engine = engine();
        let err = engine.compute_change_raw("EUR", "abc", "limited").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        engine
            .restock(
                "USD",
                &CurrencyCatalog::builtin()
                    .get("USD")
                    .unwrap()
                    .denominations()
                    .iter()
                    .map(|d| (d.to_string(), "0".to_string()))
                    .collect::<Vec<_>>(),
            )
            .unwrap();
        let err = engine.compute_change_raw("USD", "1", "limited").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infeasible);
    }

    #[test]
    fn test_restock_validation() {
        let engine = engine();
        let err = engine
            .restock("GBP", &[("3".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(
            err,
            ChangeError::Validation(ValidationError::UnknownDenomination { .. })
        ));

        let err = engine
            .restock("GBP", &[("5000".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(
            err,
            ChangeError::Validation(ValidationError::MissingDenomination { .. })
        ));

        let err = engine
            .restock("GBP", &[("5000".to_string(), "-1".to_string())])
            .unwrap_err();
        assert!(matches!(
            err,
            ChangeError::Validation(ValidationError::InvalidAmount(AmountError::Negative(_)))
        ));
    }
}

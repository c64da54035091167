use crate::core::amount::Amount;
use crate::core::currency::{Currency, CurrencyCode, CurrencyError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors arising from loading a currency catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid currency in catalog: {0}")]
    Currency(#[from] CurrencyError),
    #[error("currency {0} is defined more than once")]
    DuplicateCode(CurrencyCode),
}

/// JSON shape of a single catalog entry.
#[derive(Deserialize)]
struct CurrencyEntry {
    symbol: String,
    name: String,
    denominations: Vec<Amount>,
}

/// Read-only table of the currencies the engine can give change in.
///
/// Loaded once per process and never mutated afterwards; share it behind
/// an `Arc`.
///
/// The JSON form is an object keyed by currency code:
///
/// ```
/// use change_engine::core::catalog::CurrencyCatalog;
///
/// let catalog = CurrencyCatalog::from_json_str(r#"{
///     "EUR": { "symbol": "€", "name": "Euro", "denominations": [200, 100, 50, 20, 10, 5, 2, 1] }
/// }"#).unwrap();
///
/// let eur = catalog.get("eur").unwrap();
/// assert_eq!(eur.denominations().len(), 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CurrencyCatalog {
    currencies: BTreeMap<CurrencyCode, Currency>,
}

impl CurrencyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries: BTreeMap<String, CurrencyEntry> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (code, entry) in entries {
            // Keys differing only in case name the same currency.
            let code = CurrencyCode::new(&code);
            if catalog.currencies.contains_key(&code) {
                return Err(CatalogError::DuplicateCode(code));
            }
            catalog.insert(Currency::new(
                code,
                entry.symbol,
                entry.name,
                entry.denominations,
            )?);
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        log::debug!(
            "loaded {} currencies from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Catalog used when no file is configured: euro, US dollar, pound
    /// sterling and yen, all in minor units.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        let table: [(&str, &str, &str, &[u64]); 4] = [
            (
                "EUR",
                "€",
                "Euro",
                &[50000, 20000, 10000, 5000, 2000, 1000, 500, 200, 100, 50, 20, 10, 5, 2, 1],
            ),
            (
                "USD",
                "$",
                "US Dollar",
                &[10000, 5000, 2000, 1000, 500, 200, 100, 25, 10, 5, 1],
            ),
            (
                "GBP",
                "£",
                "Pound Sterling",
                &[5000, 2000, 1000, 500, 200, 100, 50, 20, 10, 5, 2, 1],
            ),
            (
                "JPY",
                "¥",
                "Japanese Yen",
                &[10000, 5000, 2000, 1000, 500, 100, 50, 10, 5, 1],
            ),
        ];
        for (code, symbol, name, values) in table {
            let denominations = values.iter().copied().map(Amount::from).collect();
            // The table above is strictly descending and free of zeros.
            if let Ok(currency) = Currency::new(CurrencyCode::new(code), symbol, name, denominations) {
                catalog.insert(currency);
            }
        }
        catalog
    }

    /// Add or replace a currency. Only used while building a catalog.
    pub fn insert(&mut self, currency: Currency) {
        self.currencies.insert(currency.code().clone(), currency);
    }

    pub fn get(&self, code: impl AsRef<str>) -> Option<&Currency> {
        self.currencies.get(&CurrencyCode::new(code))
    }

    pub fn contains(&self, code: impl AsRef<str>) -> bool {
        self.get(code).is_some()
    }

    /// All currencies, ordered by code.
    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

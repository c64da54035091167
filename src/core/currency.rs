use crate::core::amount::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// ISO 4217-style currency code.
///
/// Codes are normalised to upper case so that `"eur"` and `"EUR"` name the
/// same catalog entry and the same ledger file.
///
/// # Examples
///
/// ```
/// use change_engine::core::currency::CurrencyCode;
///
/// let eur = CurrencyCode::new("eur");
/// assert_eq!(eur.as_str(), "EUR");
/// assert_ne!(eur, CurrencyCode::new("USD"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from an invalid currency definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("currency code must not be empty")]
    EmptyCode,
    #[error("{currency}: denominations must be positive")]
    ZeroDenomination { currency: CurrencyCode },
    #[error("{currency}: denomination {value} appears more than once")]
    DuplicateDenomination { currency: CurrencyCode, value: Amount },
    #[error("{currency}: denominations must be strictly descending, {next} follows {previous}")]
    NotDescending {
        currency: CurrencyCode,
        previous: Amount,
        next: Amount,
    },
}

/// A currency together with the physical denominations it can be paid out in.
///
/// Denominations are face values in the minor unit (cents, pence, yen),
/// kept strictly descending and unique. A `Currency` that exists has
/// passed those checks, so the decomposition engine can rely on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Currency {
    code: CurrencyCode,
    symbol: String,
    name: String,
    denominations: Vec<Amount>,
}

impl Currency {
    pub fn new(
        code: CurrencyCode,
        symbol: impl Into<String>,
        name: impl Into<String>,
        denominations: Vec<Amount>,
    ) -> Result<Self, CurrencyError> {
        if code.as_str().is_empty() {
            return Err(CurrencyError::EmptyCode);
        }
        if denominations.iter().any(Amount::is_zero) {
            return Err(CurrencyError::ZeroDenomination { currency: code });
        }
        for pair in denominations.windows(2) {
            if pair[0] == pair[1] {
                return Err(CurrencyError::DuplicateDenomination {
                    currency: code,
                    value: pair[0].clone(),
                });
            }
            if pair[0] < pair[1] {
                return Err(CurrencyError::NotDescending {
                    currency: code,
                    previous: pair[0].clone(),
                    next: pair[1].clone(),
                });
            }
        }
        Ok(Self {
            code,
            symbol: symbol.into(),
            name: name.into(),
            denominations,
        })
    }

    pub fn code(&self) -> &CurrencyCode {
        &self.code
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Face values, largest first.
    pub fn denominations(&self) -> &[Amount] {
        &self.denominations
    }

    pub fn has_denomination(&self, value: &Amount) -> bool {
        self.denominations.binary_search_by(|d| value.cmp(d)).is_ok()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.code, self.symbol)
    }
}

use crate::core::amount::Amount;
use crate::core::currency::Currency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Available count of each denomination for one currency.
///
/// Keys are face values, values are unit counts, both arbitrary precision.
/// Counts can never be negative because [`Amount`] cannot be.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLevels {
    counts: BTreeMap<Amount, Amount>,
}

/// Mismatch between a currency's denominations and the stock held for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StockDrift {
    /// Denominations the currency has but the stock does not.
    pub missing: Vec<Amount>,
    /// Denominations the stock holds that the currency does not define.
    pub unexpected: Vec<Amount>,
}

impl fmt::Display for StockDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &[Amount]| {
            values
                .iter()
                .map(Amount::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "missing denominations [{}], unexpected denominations [{}]",
            join(&self.missing),
            join(&self.unexpected)
        )
    }
}

impl StockLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock holding `count` units of every denomination of `currency`.
    pub fn seeded(currency: &Currency, count: &Amount) -> Self {
        Self {
            counts: currency
                .denominations()
                .iter()
                .map(|d| (d.clone(), count.clone()))
                .collect(),
        }
    }

    /// Units available of `denomination`; zero when not held at all.
    pub fn get(&self, denomination: &Amount) -> Amount {
        self.counts.get(denomination).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, denomination: Amount, count: Amount) {
        self.counts.insert(denomination, count);
    }

    /// Remove `count` units of `denomination`.
    ///
    /// Returns `false`, leaving the stock untouched, if fewer units are held.
    pub fn take(&mut self, denomination: &Amount, count: &Amount) -> bool {
        match self.get(denomination).checked_sub(count) {
            Some(left) => {
                self.counts.insert(denomination.clone(), left);
                true
            }
            None => false,
        }
    }

    /// Entries from the largest denomination to the smallest.
    pub fn iter(&self) -> impl Iterator<Item = (&Amount, &Amount)> {
        self.counts.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of face value times count over every denomination.
    pub fn total_value(&self) -> Amount {
        self.counts.iter().map(|(d, n)| d * n).sum()
    }

    /// Compare the held denominations with the ones `currency` defines.
    pub fn check_against(&self, currency: &Currency) -> Result<(), StockDrift> {
        let missing: Vec<Amount> = currency
            .denominations()
            .iter()
            .filter(|d| !self.counts.contains_key(*d))
            .cloned()
            .collect();
        let unexpected: Vec<Amount> = self
            .counts
            .keys()
            .rev()
            .filter(|d| !currency.has_denomination(d))
            .cloned()
            .collect();
        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(StockDrift {
                missing,
                unexpected,
            })
        }
    }
}

impl FromIterator<(Amount, Amount)> for StockLevels {
    fn from_iter<T: IntoIterator<Item = (Amount, Amount)>>(iter: T) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for StockLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (denomination, count) in self.iter() {
            writeln!(f, "  {:>10} x {}", denomination, count)?;
        }
        Ok(())
    }
}

//! Greedy denomination decomposition.
//!
//! Walks the denominations from largest to smallest, taking as many units
//! of each as fit into what is left (and, with bounded supply, as many as
//! are available). The amount is payable iff nothing is left at the end.
//!
//! # Limitation
//!
//! Greedy is exact only for canonical denomination systems, such as the
//! euro or US dollar sets. For a non-canonical set it can report an amount
//! as unpayable even though some combination of coins would pay it, e.g.
//! `[4, 3]` for `6` (greedy takes a 4 and is left with 2). Likewise, with
//! limited stock, greedy may give up where a different mix of the
//! available units would succeed. No exhaustive or dynamic-programming
//! search is attempted; that would be a separate feature.

use crate::core::amount::Amount;
use crate::core::stock::StockLevels;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Denomination lists the engine refuses to work with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenominationError {
    #[error("denomination must be positive")]
    Zero,
    #[error("denominations must be strictly descending, {next} follows {previous}")]
    NotDescending { previous: Amount, next: Amount },
}

/// Units of one denomination used in a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denomination: Amount,
    pub count: Amount,
}

/// Denomination → units used, largest denomination first, counts > 0 only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakdown {
    coins: Vec<Coin>,
}

impl Breakdown {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, denomination: Amount, count: Amount) {
        debug_assert!(!count.is_zero());
        self.coins.push(Coin {
            denomination,
            count,
        });
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Units used of `denomination`, zero if absent.
    pub fn count_of(&self, denomination: &Amount) -> Amount {
        self.coins
            .iter()
            .find(|c| &c.denomination == denomination)
            .map(|c| c.count.clone())
            .unwrap_or_default()
    }

    /// Σ denomination × count.
    pub fn total(&self) -> Amount {
        self.coins.iter().map(|c| &c.denomination * &c.count).sum()
    }

    /// Number of physical units handed out.
    pub fn pieces(&self) -> Amount {
        self.coins.iter().map(|c| &c.count).sum()
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for coin in &self.coins {
            writeln!(f, "  {:>10} x {}", coin.denomination, coin.count)?;
        }
        Ok(())
    }
}

/// Outcome of a single greedy pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub breakdown: Breakdown,
    /// Amount the pass could not cover; zero when the change is exact.
    pub remainder: Amount,
}

impl Decomposition {
    pub fn is_exact(&self) -> bool {
        self.remainder.is_zero()
    }
}

/// The greedy change-making engine.
///
/// Pure: it never touches durable state. With bounded supply it debits the
/// caller's shadow copy of the stock, which the caller may commit or drop.
pub struct GreedyDecomposer;

impl GreedyDecomposer {
    /// Decompose `amount` over `denominations` (strictly descending).
    ///
    /// # Algorithm
    ///
    /// 1. `remaining = amount`.
    /// 2. For each denomination `d`, largest first:
    ///    `use = floor(remaining / d)`, capped at `availability[d]` when a
    ///    supply is given; if `use > 0` record it, subtract `use * d` from
    ///    `remaining` and `use` from `availability[d]`.
    /// 3. The result is exact iff `remaining == 0`.
    ///
    /// A denomination absent from `availability` counts as zero units held.
    pub fn decompose(
        amount: &Amount,
        denominations: &[Amount],
        mut availability: Option<&mut StockLevels>,
    ) -> Result<Decomposition, DenominationError> {
        validate_denominations(denominations)?;

        let mut remaining = amount.clone();
        let mut breakdown = Breakdown::new();

        for denomination in denominations {
            if remaining.is_zero() {
                break;
            }
            let Some(want) = remaining.floor_div(denomination) else {
                return Err(DenominationError::Zero);
            };
            let used = match availability.as_deref() {
                Some(stock) => want.min(stock.get(denomination)),
                None => want,
            };
            if used.is_zero() {
                continue;
            }

            let value = denomination * &used;
            remaining = remaining
                .checked_sub(&value)
                .unwrap_or_else(Amount::zero);
            if let Some(stock) = availability.as_deref_mut() {
                stock.take(denomination, &used);
            }
            breakdown.push(denomination.clone(), used);
        }

        log::trace!(
            "decomposed {} into {} unit(s), remainder {}",
            amount,
            breakdown.pieces(),
            remaining
        );

        Ok(Decomposition {
            breakdown,
            remainder: remaining,
        })
    }

    /// Decomposition with an unbounded supply of every denomination.
    pub fn unlimited(
        amount: &Amount,
        denominations: &[Amount],
    ) -> Result<Decomposition, DenominationError> {
        Self::decompose(amount, denominations, None)
    }

    /// Decomposition bounded by, and debited against, `shadow`.
    pub fn limited(
        amount: &Amount,
        denominations: &[Amount],
        shadow: &mut StockLevels,
    ) -> Result<Decomposition, DenominationError> {
        Self::decompose(amount, denominations, Some(shadow))
    }
}

fn validate_denominations(denominations: &[Amount]) -> Result<(), DenominationError> {
    if denominations.iter().any(Amount::is_zero) {
        return Err(DenominationError::Zero);
    }
    for pair in denominations.windows(2) {
        if pair[0] <= pair[1] {
            return Err(DenominationError::NotDescending {
                previous: pair[0].clone(),
                next: pair[1].clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(v: u64) -> Amount {
        Amount::from(v)
    }

    fn denoms(values: &[u64]) -> Vec<Amount> {
        values.iter().copied().map(Amount::from).collect()
    }

    fn counts(breakdown: &Breakdown) -> Vec<(u64, u64)> {
        breakdown
            .coins()
            .iter()
            .map(|c| {
                (
                    c.denomination.to_string().parse().unwrap(),
                    c.count.to_string().parse().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_canonical_euro_cents() {
        let d = denoms(&[200, 100, 50, 20, 10, 5, 2, 1]);
        let result = GreedyDecomposer::unlimited(&a(376), &d).unwrap();
        assert!(result.is_exact());
        assert_eq!(
            counts(&result.breakdown),
            vec![(200, 1), (100, 1), (50, 1), (20, 1), (5, 1), (1, 1)]
        );
        assert_eq!(result.breakdown.total(), a(376));
        assert_eq!(result.breakdown.pieces(), a(6));
    }

    #[test]
    fn test_zero_amount_is_exact_and_empty() {
        let result = GreedyDecomposer::unlimited(&Amount::zero(), &denoms(&[5, 1])).unwrap();
        assert!(result.is_exact());
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_empty_denominations() {
        let result = GreedyDecomposer::unlimited(&a(7), &[]).unwrap();
        assert!(!result.is_exact());
        assert_eq!(result.remainder, a(7));

        let result = GreedyDecomposer::unlimited(&Amount::zero(), &[]).unwrap();
        assert!(result.is_exact());
    }

    #[test]
    fn test_zero_denomination_rejected() {
        let err = GreedyDecomposer::unlimited(&a(10), &denoms(&[5, 0])).unwrap_err();
        assert_eq!(err, DenominationError::Zero);
    }

    #[test]
    fn test_unsorted_denominations_rejected() {
        let err = GreedyDecomposer::unlimited(&a(10), &denoms(&[1, 5])).unwrap_err();
        assert!(matches!(err, DenominationError::NotDescending { .. }));
        let err = GreedyDecomposer::unlimited(&a(10), &denoms(&[5, 5])).unwrap_err();
        assert!(matches!(err, DenominationError::NotDescending { .. }));
    }

    #[test]
    fn test_limited_stock_insufficiency() {
        let d = denoms(&[100, 50]);
        let unlimited = GreedyDecomposer::unlimited(&a(150), &d).unwrap();
        assert!(unlimited.is_exact());
        assert_eq!(counts(&unlimited.breakdown), vec![(100, 1), (50, 1)]);

        let mut shadow: StockLevels = [(a(100), a(0)), (a(50), a(1))].into_iter().collect();
        let limited = GreedyDecomposer::limited(&a(150), &d, &mut shadow).unwrap();
        assert!(!limited.is_exact());
        assert_eq!(limited.remainder, a(100));
        assert_eq!(counts(&limited.breakdown), vec![(50, 1)]);
        // The shadow copy is debited even on failure; the caller discards it.
        assert_eq!(shadow.get(&a(50)), a(0));
    }

    #[test]
    fn test_limited_debits_shadow_exactly() {
        let d = denoms(&[10, 5, 1]);
        let mut shadow: StockLevels = [(a(10), a(1)), (a(5), a(5)), (a(1), a(5))]
            .into_iter()
            .collect();
        let result = GreedyDecomposer::limited(&a(27), &d, &mut shadow).unwrap();
        assert!(result.is_exact());
        assert_eq!(counts(&result.breakdown), vec![(10, 1), (5, 3), (1, 2)]);
        assert_eq!(shadow.get(&a(10)), a(0));
        assert_eq!(shadow.get(&a(5)), a(2));
        assert_eq!(shadow.get(&a(1)), a(3));
    }

    #[test]
    fn test_missing_denomination_counts_as_empty() {
        let d = denoms(&[10, 1]);
        let mut shadow: StockLevels = [(a(1), a(100))].into_iter().collect();
        let result = GreedyDecomposer::limited(&a(12), &d, &mut shadow).unwrap();
        assert!(result.is_exact());
        assert_eq!(counts(&result.breakdown), vec![(1, 12)]);
    }

    #[test]
    fn test_non_canonical_twenty_five_ten() {
        let result = GreedyDecomposer::unlimited(&a(30), &denoms(&[25, 10])).unwrap();
        assert!(!result.is_exact());
        assert_eq!(result.remainder, a(5));
        assert_eq!(counts(&result.breakdown), vec![(25, 1)]);
    }

    #[test]
    fn test_non_canonical_four_three_stays_greedy() {
        // 3 + 3 would pay 6, but the engine is greedy-only.
        let result = GreedyDecomposer::unlimited(&a(6), &denoms(&[4, 3])).unwrap();
        assert!(!result.is_exact());
        assert_eq!(result.remainder, a(2));
        assert_eq!(counts(&result.breakdown), vec![(4, 1)]);
    }

    #[test]
    fn test_amount_beyond_u64() {
        let amount = Amount::parse("100000000000000000000000000001").unwrap();
        let d = denoms(&[1_000_000_000, 1]);
        let result = GreedyDecomposer::unlimited(&amount, &d).unwrap();
        assert!(result.is_exact());
        assert_eq!(result.breakdown.total(), amount);
        assert_eq!(result.breakdown.count_of(&a(1)), a(1));
    }
}

use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};
use std::str::FromStr;
use thiserror::Error;

/// Errors arising from parsing an amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative, got {0:?}")]
    Negative(String),
    #[error("amount must be a non-negative integer in minor units, got {0:?}")]
    Malformed(String),
}

/// A non-negative integer quantity of arbitrary size.
///
/// Used for requested amounts, denomination face values and stock counts,
/// all expressed in the currency's minor unit. Negative values cannot be
/// represented and no operation goes through floating point.
///
/// # Examples
///
/// ```
/// use change_engine::core::amount::Amount;
///
/// let amount: Amount = "376".parse().unwrap();
/// let coin = Amount::from(200u64);
/// assert_eq!(amount.floor_div(&coin), Some(Amount::from(1u64)));
/// assert_eq!(amount.checked_sub(&coin), Some(Amount::from(176u64)));
/// assert!("-5".parse::<Amount>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a decimal string of ASCII digits. Leading zeros are accepted.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        if input.is_empty() {
            return Err(AmountError::Empty);
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            let negative = input
                .strip_prefix('-')
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));
            return Err(if negative {
                AmountError::Negative(input.to_string())
            } else {
                AmountError::Malformed(input.to_string())
            });
        }
        BigUint::parse_bytes(input.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| AmountError::Malformed(input.to_string()))
    }

    /// `floor(self / divisor)`, or `None` when `divisor` is zero.
    pub fn floor_div(&self, divisor: &Amount) -> Option<Amount> {
        if divisor.is_zero() {
            return None;
        }
        Some(Self(&self.0 / &divisor.0))
    }

    /// `self - rhs`, or `None` when the result would be negative.
    pub fn checked_sub(&self, rhs: &Amount) -> Option<Amount> {
        self.0.checked_sub(&rhs.0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl<'a> Mul<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn mul(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 * &rhs.0)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, x| &acc + x)
    }
}

impl Sum<Amount> for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, x| &acc + &x)
    }
}

// Amounts travel as decimal strings so they survive JSON consumers that
// would otherwise round large integers, and so they can be used as map keys.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer or a string of decimal digits")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(Amount::from)
                    .map_err(|_| E::custom(AmountError::Negative(v.to_string())))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

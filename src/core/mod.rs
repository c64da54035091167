//! Foundational types: amounts, currencies, the currency catalog and stock levels.

pub mod amount;
pub mod catalog;
pub mod currency;
pub mod stock;

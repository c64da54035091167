//! Change-making: the greedy decomposer and the caller-facing API on top of it.

pub mod change;
pub mod greedy;

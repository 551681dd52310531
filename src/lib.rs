//! zonescan: multi-timeframe confluence zone screener.
//!
//! Finds liquidity zones where trendlines, support/resistance levels,
//! Fibonacci retracements, volume and round numbers agree, evaluates a
//! direct and a break/retest entry model against them, and validates the
//! resulting trades against risk limits.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

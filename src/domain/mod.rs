//! Core domain types and logic. No I/O happens below this module.

pub mod config;
pub mod config_validation;
pub mod confluence;
pub mod entry;
pub mod error;
pub mod ohlcv;
pub mod opportunity;
pub mod pipeline;
pub mod prescreen;
pub mod stats;
pub mod structure;
pub mod summary;
pub mod timeseries;
pub mod universe;
pub mod validator;

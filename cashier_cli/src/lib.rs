//! Cashier command-line interface
//!
//! Configuration, orchestration and console rendering around `cashier_core`.

pub mod args;
pub mod config;
pub mod error;
pub mod orchestrators;
pub mod paths;
pub mod progress;
pub mod terminal;

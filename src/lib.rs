//! Corporate coin ledger.
//!
//! Employees hold coin balances, buy merch with them and send them to each
//! other. The crate owns the ledger core: the engines that keep balances and
//! the purchase and transfer records consistent, and the aggregator that
//! rebuilds an employee's activity from those records.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;

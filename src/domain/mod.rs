//! Domain layer: coins, employees, the merch catalog, ledger records and the
//! storage ports the application layer is written against.

pub mod activity;
pub mod catalog;
pub mod coins;
pub mod employee;
pub mod ports;
pub mod records;

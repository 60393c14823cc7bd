//! Application layer containing the ledger core.
//!
//! Purchases and transfers run as units of work (see [`unit_of_work`]) so the
//! balance check and the writes it guards commit or roll back together.
//! [`service::MerchService`] bundles the engines behind one handle.

pub mod activity;
pub mod purchase;
pub mod service;
pub mod transfer;
pub mod unit_of_work;

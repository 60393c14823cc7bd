use super::catalog::{CatalogItem, ItemId};
use super::coins::{Amount, Balance};
use super::employee::{Employee, EmployeeId};
use super::records::{NewPurchase, NewTransfer, PurchaseRecord, TransferRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable home of employees, the catalog and the append-only purchase and
/// transfer records.
///
/// Plain reads see committed state only. Mutations of balances and records
/// happen exclusively through a [`LedgerTransaction`] obtained from
/// [`LedgerStore::begin`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>>;
    async fn employee_by_id(&self, id: EmployeeId) -> Result<Option<Employee>>;
    /// All employees, ordered by id.
    async fn employees(&self) -> Result<Vec<Employee>>;

    async fn catalog_item_by_name(&self, name: &str) -> Result<Option<CatalogItem>>;
    async fn catalog_item_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>>;

    /// Purchases made by `employee`, in creation order.
    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>>;
    /// Transfers where `employee` is the sender, in creation order.
    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>>;
    /// Transfers where `employee` is the receiver, in creation order.
    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>>;

    /// Opens a read-only view pinned to the current committed state.
    ///
    /// Reads through the view are mutually consistent: no unit commits
    /// between them. Writers wait while a view is held, so drop it as soon as
    /// its reads are done.
    async fn snapshot(&self) -> Result<Box<dyn LedgerSnapshot>>;

    /// Opens an atomic unit of work.
    ///
    /// Units are isolated from each other: a unit never observes another
    /// unit's uncommitted writes, and two units can not both read the same
    /// balance and commit conflicting updates to it.
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;

    /// Returns the employee named `username`, creating it with
    /// `starting_balance` if it does not exist yet.
    async fn enroll_employee(
        &self,
        username: &str,
        credential_hash: &str,
        starting_balance: Balance,
    ) -> Result<Employee>;

    /// Returns the catalog item named `name`, creating it at `price` if it
    /// does not exist yet. Existing prices are left untouched.
    async fn provision_item(&self, name: &str, price: Amount) -> Result<CatalogItem>;
}

/// A consistent, read-only view of a [`LedgerStore`].
#[async_trait]
pub trait LedgerSnapshot: Send + Sync {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>>;
    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>>;
    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>>;
    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>>;
}

/// An open atomic unit of work against a [`LedgerStore`].
///
/// Writes become visible to others only on [`commit`](Self::commit).
/// Dropping the transaction without committing rolls every write back.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Reads the current row for `username` and holds it until the unit ends.
    async fn employee_for_update(&mut self, username: &str) -> Result<Option<Employee>>;
    async fn update_balance(&mut self, employee: EmployeeId, balance: Balance) -> Result<()>;
    async fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<PurchaseRecord>;
    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;

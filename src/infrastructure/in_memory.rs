use crate::domain::catalog::{CatalogItem, ItemId};
use crate::domain::coins::{Amount, Balance};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::ports::{LedgerSnapshot, LedgerStore, LedgerTransaction};
use crate::domain::records::{
    NewPurchase, NewTransfer, PurchaseId, PurchaseRecord, TransferId, TransferRecord,
};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerState {
    employees: BTreeMap<EmployeeId, Employee>,
    usernames: HashMap<String, EmployeeId>,
    items: BTreeMap<ItemId, CatalogItem>,
    item_names: HashMap<String, ItemId>,
    purchases: Vec<PurchaseRecord>,
    transfers: Vec<TransferRecord>,
}

impl LedgerState {
    fn employee_named(&self, username: &str) -> Option<Employee> {
        self.usernames
            .get(username)
            .and_then(|id| self.employees.get(id))
            .cloned()
    }

    fn purchases_of(&self, employee: EmployeeId) -> Vec<PurchaseRecord> {
        self.purchases
            .iter()
            .filter(|p| p.employee_id == employee)
            .cloned()
            .collect()
    }

    fn transfers_where<F>(&self, keep: F) -> Vec<TransferRecord>
    where
        F: Fn(&TransferRecord) -> bool,
    {
        self.transfers
            .iter()
            .filter(|t| keep(*t))
            .cloned()
            .collect()
    }

    fn employee_mut(&mut self, id: EmployeeId) -> Result<&mut Employee> {
        self.employees
            .get_mut(&id)
            .ok_or_else(|| LedgerError::storage(format!("employee {id} does not exist")))
    }

    fn ensure_employee(&self, id: EmployeeId) -> Result<()> {
        if self.employees.contains_key(&id) {
            Ok(())
        } else {
            Err(LedgerError::storage(format!("employee {id} does not exist")))
        }
    }
}

/// A thread-safe in-memory ledger.
///
/// All state sits behind one `Arc<RwLock<..>>`. Plain reads take the read
/// lock briefly; an atomic unit owns the write lock from `begin` until it
/// commits or rolls back, so units are fully serialized.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        Ok(self.state.read().await.employee_named(username))
    }

    async fn employee_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        let state = self.state.read().await;
        Ok(state.employees.get(&id).cloned())
    }

    async fn employees(&self) -> Result<Vec<Employee>> {
        let state = self.state.read().await;
        Ok(state.employees.values().cloned().collect())
    }

    async fn catalog_item_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        let state = self.state.read().await;
        Ok(state
            .item_names
            .get(name)
            .and_then(|id| state.items.get(id))
            .cloned())
    }

    async fn catalog_item_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        let state = self.state.read().await;
        Ok(state.items.get(&id).cloned())
    }

    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>> {
        Ok(self.state.read().await.purchases_of(employee))
    }

    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        let state = self.state.read().await;
        Ok(state.transfers_where(|t| t.sender_id == employee))
    }

    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        let state = self.state.read().await;
        Ok(state.transfers_where(|t| t.receiver_id == employee))
    }

    async fn snapshot(&self) -> Result<Box<dyn LedgerSnapshot>> {
        let state = Arc::clone(&self.state).read_owned().await;
        Ok(Box::new(InMemorySnapshot { state }))
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let state = Arc::clone(&self.state).write_owned().await;
        Ok(Box::new(InMemoryTransaction {
            state,
            undo: Vec::new(),
        }))
    }

    async fn enroll_employee(
        &self,
        username: &str,
        credential_hash: &str,
        starting_balance: Balance,
    ) -> Result<Employee> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .usernames
            .get(username)
            .and_then(|id| state.employees.get(id))
        {
            return Ok(existing.clone());
        }

        let id = EmployeeId(state.employees.len() as u64 + 1);
        let employee = Employee {
            id,
            username: username.to_string(),
            credential_hash: credential_hash.to_string(),
            balance: starting_balance,
        };
        state.usernames.insert(employee.username.clone(), id);
        state.employees.insert(id, employee.clone());
        debug!(employee = %id, username, "enrolled employee");
        Ok(employee)
    }

    async fn provision_item(&self, name: &str, price: Amount) -> Result<CatalogItem> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.item_names.get(name).and_then(|id| state.items.get(id)) {
            return Ok(existing.clone());
        }

        let id = ItemId(state.items.len() as u64 + 1);
        let item = CatalogItem {
            id,
            name: name.to_string(),
            price,
        };
        state.item_names.insert(item.name.clone(), id);
        state.items.insert(id, item.clone());
        Ok(item)
    }
}

/// A read guard over [`InMemoryLedgerStore`]; no unit can begin while it
/// is held.
pub struct InMemorySnapshot {
    state: OwnedRwLockReadGuard<LedgerState>,
}

#[async_trait]
impl LedgerSnapshot for InMemorySnapshot {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        Ok(self.state.employee_named(username))
    }

    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>> {
        Ok(self.state.purchases_of(employee))
    }

    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        Ok(self.state.transfers_where(|t| t.sender_id == employee))
    }

    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        Ok(self.state.transfers_where(|t| t.receiver_id == employee))
    }
}

/// Inverse of one write performed inside an [`InMemoryTransaction`].
#[derive(Debug)]
enum Undo {
    Balance {
        employee: EmployeeId,
        previous: Balance,
    },
    Purchase,
    Transfer,
}

/// An atomic unit over [`InMemoryLedgerStore`].
///
/// Writes go straight to the locked state and are recorded in an undo log;
/// nobody else can observe them while the write guard is held. Rolling back
/// (explicitly or by drop) replays the log in reverse.
pub struct InMemoryTransaction {
    state: OwnedRwLockWriteGuard<LedgerState>,
    undo: Vec<Undo>,
}

impl InMemoryTransaction {
    fn revert(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Balance { employee, previous } => {
                    if let Some(row) = self.state.employees.get_mut(&employee) {
                        row.balance = previous;
                    }
                }
                Undo::Purchase => {
                    self.state.purchases.pop();
                }
                Undo::Transfer => {
                    self.state.transfers.pop();
                }
            }
        }
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.undo.is_empty() {
            debug!(writes = self.undo.len(), "rolling back abandoned transaction");
            self.revert();
        }
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn employee_for_update(&mut self, username: &str) -> Result<Option<Employee>> {
        Ok(self.state.employee_named(username))
    }

    async fn update_balance(&mut self, employee: EmployeeId, balance: Balance) -> Result<()> {
        let row = self.state.employee_mut(employee)?;
        let previous = row.balance;
        row.balance = balance;
        self.undo.push(Undo::Balance { employee, previous });
        Ok(())
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<PurchaseRecord> {
        self.state.ensure_employee(purchase.employee_id)?;
        if !self.state.items.contains_key(&purchase.item_id) {
            return Err(LedgerError::storage(format!(
                "catalog item {} does not exist",
                purchase.item_id
            )));
        }

        let record = purchase.into_record(PurchaseId(self.state.purchases.len() as u64 + 1));
        self.state.purchases.push(record.clone());
        self.undo.push(Undo::Purchase);
        Ok(record)
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        self.state.ensure_employee(transfer.sender_id)?;
        self.state.ensure_employee(transfer.receiver_id)?;
        if transfer.sender_id == transfer.receiver_id {
            return Err(LedgerError::storage(format!(
                "transfer sender and receiver are both employee {}",
                transfer.sender_id
            )));
        }

        let record = transfer.into_record(TransferId(self.state.transfers.len() as u64 + 1));
        self.state.transfers.push(record.clone());
        self.undo.push(Undo::Transfer);
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.revert();
        Ok(())
    }
}

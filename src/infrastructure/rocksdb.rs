use crate::domain::catalog::{CatalogItem, ItemId};
use crate::domain::coins::{Amount, Balance};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::ports::{LedgerSnapshot, LedgerStore, LedgerTransaction};
use crate::domain::records::{
    NewPurchase, NewTransfer, PurchaseId, PurchaseRecord, TransferId, TransferRecord,
};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Column Family for employee rows, keyed by id.
pub const CF_EMPLOYEES: &str = "employees";
/// Column Family mapping usernames to employee ids.
pub const CF_USERNAMES: &str = "usernames";
/// Column Family for catalog items, keyed by id.
pub const CF_ITEMS: &str = "items";
/// Column Family mapping item names to item ids.
pub const CF_ITEM_NAMES: &str = "item_names";
/// Column Family for purchase records, keyed by id.
pub const CF_PURCHASES: &str = "purchases";
/// Column Family for transfer records, keyed by id.
pub const CF_TRANSFERS: &str = "transfers";
/// Column Family holding id sequences.
pub const CF_META: &str = "meta";

const ALL_CFS: [&str; 7] = [
    CF_EMPLOYEES,
    CF_USERNAMES,
    CF_ITEMS,
    CF_ITEM_NAMES,
    CF_PURCHASES,
    CF_TRANSFERS,
    CF_META,
];

const SEQ_EMPLOYEE: &[u8] = b"seq:employee";
const SEQ_ITEM: &[u8] = b"seq:item";
const SEQ_PURCHASE: &[u8] = b"seq:purchase";
const SEQ_TRANSFER: &[u8] = b"seq:transfer";

/// A persistent ledger backed by RocksDB.
///
/// Every entity lives in its own Column Family with big-endian id keys, so
/// iteration order equals creation order. Atomic units are serialized by a
/// per-store writer lock and land in the database as a single `WriteBatch`,
/// which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDbLedgerStore {
    /// Opens or creates a ledger database at `path`, creating any missing
    /// Column Families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::storage(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_id(&self, cf: &str, key: &[u8]) -> Result<Option<u64>> {
        self.db
            .get_cf(self.cf(cf)?, key)?
            .map(|bytes| decode_u64(&bytes))
            .transpose()
    }

    fn scan<T, F>(&self, cf: &str, mut keep: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            let row: T = serde_json::from_slice(&value)?;
            if keep(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn next_seq(&self, key: &[u8]) -> Result<u64> {
        Ok(self.get_id(CF_META, key)?.unwrap_or(0) + 1)
    }

    fn write(&self, writes: Vec<PendingWrite>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for write in &writes {
            batch.put_cf(self.cf(write.cf)?, &write.key, &write.value);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::storage(format!("expected 8-byte id, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// A buffered `put` waiting for commit.
struct PendingWrite {
    cf: &'static str,
    key: Vec<u8>,
    value: Vec<u8>,
}

impl PendingWrite {
    fn json<T: Serialize>(cf: &'static str, id: u64, row: &T) -> Result<Self> {
        Ok(Self {
            cf,
            key: id.to_be_bytes().to_vec(),
            value: serde_json::to_vec(row)?,
        })
    }

    fn index(cf: &'static str, name: &str, id: u64) -> Self {
        Self {
            cf,
            key: name.as_bytes().to_vec(),
            value: id.to_be_bytes().to_vec(),
        }
    }

    fn seq(key: &[u8], value: u64) -> Self {
        Self {
            cf: CF_META,
            key: key.to_vec(),
            value: value.to_be_bytes().to_vec(),
        }
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        match self.get_id(CF_USERNAMES, username.as_bytes())? {
            Some(id) => self.get_json(CF_EMPLOYEES, &id.to_be_bytes()),
            None => Ok(None),
        }
    }

    async fn employee_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        self.get_json(CF_EMPLOYEES, &id.0.to_be_bytes())
    }

    async fn employees(&self) -> Result<Vec<Employee>> {
        self.scan(CF_EMPLOYEES, |_: &Employee| true)
    }

    async fn catalog_item_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        match self.get_id(CF_ITEM_NAMES, name.as_bytes())? {
            Some(id) => self.get_json(CF_ITEMS, &id.to_be_bytes()),
            None => Ok(None),
        }
    }

    async fn catalog_item_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        self.get_json(CF_ITEMS, &id.0.to_be_bytes())
    }

    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>> {
        self.scan(CF_PURCHASES, |p: &PurchaseRecord| p.employee_id == employee)
    }

    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        self.scan(CF_TRANSFERS, |t: &TransferRecord| t.sender_id == employee)
    }

    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        self.scan(CF_TRANSFERS, |t: &TransferRecord| t.receiver_id == employee)
    }

    async fn snapshot(&self) -> Result<Box<dyn LedgerSnapshot>> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        Ok(Box::new(RocksDbSnapshot {
            store: self.clone(),
            _guard: guard,
        }))
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        Ok(Box::new(RocksDbTransaction {
            store: self.clone(),
            _guard: guard,
            rows: HashMap::new(),
            seqs: HashMap::new(),
            pending: Vec::new(),
        }))
    }

    async fn enroll_employee(
        &self,
        username: &str,
        credential_hash: &str,
        starting_balance: Balance,
    ) -> Result<Employee> {
        let _guard = self.writer.lock().await;
        if let Some(existing) = self.employee_by_username(username).await? {
            return Ok(existing);
        }

        let id = self.next_seq(SEQ_EMPLOYEE)?;
        let employee = Employee {
            id: EmployeeId(id),
            username: username.to_string(),
            credential_hash: credential_hash.to_string(),
            balance: starting_balance,
        };
        self.write(vec![
            PendingWrite::json(CF_EMPLOYEES, id, &employee)?,
            PendingWrite::index(CF_USERNAMES, username, id),
            PendingWrite::seq(SEQ_EMPLOYEE, id),
        ])?;
        debug!(employee = id, username, "enrolled employee");
        Ok(employee)
    }

    async fn provision_item(&self, name: &str, price: Amount) -> Result<CatalogItem> {
        let _guard = self.writer.lock().await;
        if let Some(existing) = self.catalog_item_by_name(name).await? {
            return Ok(existing);
        }

        let id = self.next_seq(SEQ_ITEM)?;
        let item = CatalogItem {
            id: ItemId(id),
            name: name.to_string(),
            price,
        };
        self.write(vec![
            PendingWrite::json(CF_ITEMS, id, &item)?,
            PendingWrite::index(CF_ITEM_NAMES, name, id),
            PendingWrite::seq(SEQ_ITEM, id),
        ])?;
        Ok(item)
    }
}

/// A consistent view over [`RocksDbLedgerStore`].
///
/// Every write path takes the writer lock, so holding it pins the committed
/// state for as long as the view lives.
pub struct RocksDbSnapshot {
    store: RocksDbLedgerStore,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LedgerSnapshot for RocksDbSnapshot {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        self.store.employee_by_username(username).await
    }

    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>> {
        self.store.purchases_by(employee).await
    }

    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        self.store.transfers_sent_by(employee).await
    }

    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        self.store.transfers_received_by(employee).await
    }
}

/// An atomic unit over [`RocksDbLedgerStore`].
///
/// Holds the store's writer lock for its whole life. Rows it touches are
/// cached locally so later reads see earlier writes; all writes are buffered
/// and handed to RocksDB as one batch on commit. Dropping it discards the
/// buffer.
pub struct RocksDbTransaction {
    store: RocksDbLedgerStore,
    _guard: OwnedMutexGuard<()>,
    rows: HashMap<EmployeeId, Employee>,
    seqs: HashMap<&'static [u8], u64>,
    pending: Vec<PendingWrite>,
}

impl RocksDbTransaction {
    fn row(&mut self, id: EmployeeId) -> Result<&mut Employee> {
        if !self.rows.contains_key(&id) {
            let employee = self
                .store
                .get_json::<Employee>(CF_EMPLOYEES, &id.0.to_be_bytes())?
                .ok_or_else(|| LedgerError::storage(format!("employee {id} does not exist")))?;
            self.rows.insert(id, employee);
        }
        self.rows
            .get_mut(&id)
            .ok_or_else(|| LedgerError::storage(format!("employee {id} does not exist")))
    }

    fn allocate(&mut self, key: &'static [u8]) -> Result<u64> {
        let next = match self.seqs.get(key) {
            Some(current) => current + 1,
            None => self.store.next_seq(key)?,
        };
        self.seqs.insert(key, next);
        self.pending.push(PendingWrite::seq(key, next));
        Ok(next)
    }
}

#[async_trait]
impl LedgerTransaction for RocksDbTransaction {
    async fn employee_for_update(&mut self, username: &str) -> Result<Option<Employee>> {
        match self.store.get_id(CF_USERNAMES, username.as_bytes())? {
            Some(id) => Ok(Some(self.row(EmployeeId(id))?.clone())),
            None => Ok(None),
        }
    }

    async fn update_balance(&mut self, employee: EmployeeId, balance: Balance) -> Result<()> {
        let row = self.row(employee)?;
        row.balance = balance;
        let write = PendingWrite::json(CF_EMPLOYEES, employee.0, row)?;
        self.pending.push(write);
        Ok(())
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<PurchaseRecord> {
        self.row(purchase.employee_id)?;
        if self.store.catalog_item_by_id(purchase.item_id).await?.is_none() {
            return Err(LedgerError::storage(format!(
                "catalog item {} does not exist",
                purchase.item_id
            )));
        }

        let id = self.allocate(SEQ_PURCHASE)?;
        let record = purchase.into_record(PurchaseId(id));
        self.pending
            .push(PendingWrite::json(CF_PURCHASES, id, &record)?);
        Ok(record)
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        self.row(transfer.sender_id)?;
        self.row(transfer.receiver_id)?;
        if transfer.sender_id == transfer.receiver_id {
            return Err(LedgerError::storage(format!(
                "transfer sender and receiver are both employee {}",
                transfer.sender_id
            )));
        }

        let id = self.allocate(SEQ_TRANSFER)?;
        let record = transfer.into_record(TransferId(id));
        self.pending
            .push(PendingWrite::json(CF_TRANSFERS, id, &record)?);
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.store
            .write(this.pending)
            .map_err(|err| LedgerError::CommitFailed(err.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        debug!(writes = self.pending.len(), "discarding buffered writes");
        Ok(())
    }
}

use async_trait::async_trait;
use merch_ledger::application::service::MerchService;
use merch_ledger::config::LedgerConfig;
use merch_ledger::domain::catalog::{CatalogItem, ItemId};
use merch_ledger::domain::coins::{Amount, Balance};
use merch_ledger::domain::employee::{Employee, EmployeeId};
use merch_ledger::domain::ports::{LedgerSnapshot, LedgerStore, LedgerTransaction};
use merch_ledger::domain::records::{NewPurchase, NewTransfer, PurchaseRecord, TransferRecord};
use merch_ledger::error::{ActivityQuery, ErrorKind, LedgerError, Result};
use merch_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use std::sync::Arc;
use std::time::Duration;

mod common;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    InsertPurchase,
    InsertTransfer,
    Commit,
    PurchasesQuery,
    SentQuery,
    ReceivedQuery,
    SlowUnit,
}

/// Delegates to an in-memory ledger but fails at one chosen point.
struct FaultyStore {
    inner: InMemoryLedgerStore,
    fault: Fault,
}

fn injected(what: &str) -> LedgerError {
    LedgerError::storage(format!("injected failure: {what}"))
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        self.inner.employee_by_username(username).await
    }

    async fn employee_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        self.inner.employee_by_id(id).await
    }

    async fn employees(&self) -> Result<Vec<Employee>> {
        self.inner.employees().await
    }

    async fn catalog_item_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        self.inner.catalog_item_by_name(name).await
    }

    async fn catalog_item_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        self.inner.catalog_item_by_id(id).await
    }

    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>> {
        self.inner.purchases_by(employee).await
    }

    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        self.inner.transfers_sent_by(employee).await
    }

    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        self.inner.transfers_received_by(employee).await
    }

    async fn snapshot(&self) -> Result<Box<dyn LedgerSnapshot>> {
        Ok(Box::new(FaultySnapshot {
            inner: self.inner.snapshot().await?,
            fault: self.fault,
        }))
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }

    async fn enroll_employee(
        &self,
        username: &str,
        credential_hash: &str,
        starting_balance: Balance,
    ) -> Result<Employee> {
        self.inner
            .enroll_employee(username, credential_hash, starting_balance)
            .await
    }

    async fn provision_item(&self, name: &str, price: Amount) -> Result<CatalogItem> {
        self.inner.provision_item(name, price).await
    }
}

struct FaultySnapshot {
    inner: Box<dyn LedgerSnapshot>,
    fault: Fault,
}

#[async_trait]
impl LedgerSnapshot for FaultySnapshot {
    async fn employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        self.inner.employee_by_username(username).await
    }

    async fn purchases_by(&self, employee: EmployeeId) -> Result<Vec<PurchaseRecord>> {
        if self.fault == Fault::PurchasesQuery {
            return Err(injected("purchases query"));
        }
        self.inner.purchases_by(employee).await
    }

    async fn transfers_sent_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        if self.fault == Fault::SentQuery {
            return Err(injected("sent query"));
        }
        self.inner.transfers_sent_by(employee).await
    }

    async fn transfers_received_by(&self, employee: EmployeeId) -> Result<Vec<TransferRecord>> {
        if self.fault == Fault::ReceivedQuery {
            return Err(injected("received query"));
        }
        self.inner.transfers_received_by(employee).await
    }
}

struct FaultyTransaction {
    inner: Box<dyn LedgerTransaction>,
    fault: Fault,
}

#[async_trait]
impl LedgerTransaction for FaultyTransaction {
    async fn employee_for_update(&mut self, username: &str) -> Result<Option<Employee>> {
        if self.fault == Fault::SlowUnit {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.inner.employee_for_update(username).await
    }

    async fn update_balance(&mut self, employee: EmployeeId, balance: Balance) -> Result<()> {
        self.inner.update_balance(employee, balance).await
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> Result<PurchaseRecord> {
        if self.fault == Fault::InsertPurchase {
            return Err(injected("insert purchase"));
        }
        self.inner.insert_purchase(purchase).await
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        if self.fault == Fault::InsertTransfer {
            return Err(injected("insert transfer"));
        }
        self.inner.insert_transfer(transfer).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.fault == Fault::Commit {
            // The inner unit is dropped uncommitted, which rolls it back.
            return Err(injected("commit"));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

async fn faulty_service(fault: Fault) -> (MerchService, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore {
        inner: InMemoryLedgerStore::new(),
        fault,
    });
    common::seed(store.as_ref(), &[("alice", 100), ("bob", 100)]).await;
    let service = MerchService::new(store.clone(), LedgerConfig::default());
    (service, store)
}

async fn assert_untouched(store: &FaultyStore) {
    let inner = &store.inner;
    for name in ["alice", "bob"] {
        let employee = inner.employee_by_username(name).await.unwrap().unwrap();
        assert_eq!(employee.balance, Balance::new(100), "{name} balance changed");
        assert!(inner.purchases_by(employee.id).await.unwrap().is_empty());
        assert!(inner.transfers_sent_by(employee.id).await.unwrap().is_empty());
        assert!(inner.transfers_received_by(employee.id).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_failed_purchase_insert_rolls_back_debit() {
    let (service, store) = faulty_service(Fault::InsertPurchase).await;

    let err = service.purchase("alice", "cup").await.unwrap_err();
    assert!(matches!(err, LedgerError::TransactionAborted { .. }));
    assert_eq!(err.kind(), ErrorKind::CommitFailed);
    assert!(err.to_string().contains("insert purchase"));
    assert_untouched(&store).await;
}

#[tokio::test]
async fn test_failed_transfer_insert_rolls_back_both_balances() {
    let (service, store) = faulty_service(Fault::InsertTransfer).await;

    let err = service.transfer("alice", "bob", 30).await.unwrap_err();
    assert!(matches!(err, LedgerError::TransactionAborted { .. }));
    assert_eq!(err.kind(), ErrorKind::CommitFailed);
    assert_untouched(&store).await;
}

#[tokio::test]
async fn test_commit_failure_is_reported_and_leaves_no_trace() {
    let (service, store) = faulty_service(Fault::Commit).await;

    let err = service.purchase("alice", "cup").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommitFailed);
    let err = service.transfer("alice", "bob", 30).await.unwrap_err();
    assert!(matches!(err, LedgerError::CommitFailed(_)));

    assert_untouched(&store).await;
}

#[tokio::test]
async fn test_ledger_usable_after_failures() {
    let (service, store) = faulty_service(Fault::InsertPurchase).await;

    assert!(service.purchase("alice", "cup").await.is_err());
    // Transfers are unaffected by this fault and must not be blocked by the
    // rolled-back purchase.
    service.transfer("alice", "bob", 30).await.unwrap();
    assert_eq!(common::coins(store.as_ref(), "alice").await, 70);
    assert_eq!(common::coins(store.as_ref(), "bob").await, 130);
}

#[tokio::test]
async fn test_aggregation_failure_names_sub_query() {
    for (fault, query) in [
        (Fault::PurchasesQuery, ActivityQuery::Inventory),
        (Fault::SentQuery, ActivityQuery::Sent),
        (Fault::ReceivedQuery, ActivityQuery::Received),
    ] {
        let (service, _) = faulty_service(fault).await;
        service.transfer("bob", "alice", 10).await.unwrap();

        match service.activity("alice").await {
            Err(LedgerError::AggregationFailed { query: failed, .. }) => {
                assert_eq!(failed, query)
            }
            other => panic!("expected aggregation failure for {query}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_stalled_unit_times_out_without_effect() {
    let store = Arc::new(FaultyStore {
        inner: InMemoryLedgerStore::new(),
        fault: Fault::SlowUnit,
    });
    common::seed(store.as_ref(), &[("alice", 100), ("bob", 100)]).await;
    let config = LedgerConfig::default().with_atomic_timeout(Duration::from_millis(50));
    let service = MerchService::new(store.clone(), config);

    let err = service.transfer("alice", "bob", 30).await.unwrap_err();
    assert!(matches!(err, LedgerError::TimedOut { .. }));
    assert_eq!(err.kind(), ErrorKind::CommitFailed);
    let err = service.purchase("alice", "cup").await.unwrap_err();
    assert!(matches!(err, LedgerError::TimedOut { .. }));

    assert_untouched(&store).await;
}

#![allow(dead_code)]

use merch_ledger::application::service::MerchService;
use merch_ledger::config::LedgerConfig;
use merch_ledger::domain::catalog::DEFAULT_CATALOG;
use merch_ledger::domain::coins::{Amount, Balance};
use merch_ledger::domain::ports::LedgerStore;
use merch_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Provisions the default catalog and enrolls each `(username, coins)` pair.
pub async fn seed(store: &dyn LedgerStore, employees: &[(&str, u64)]) {
    for (name, price) in DEFAULT_CATALOG {
        store
            .provision_item(name, Amount::new(*price).unwrap())
            .await
            .unwrap();
    }
    for (username, coins) in employees {
        store
            .enroll_employee(username, "hash", Balance::new(*coins))
            .await
            .unwrap();
    }
}

pub async fn seeded_service(employees: &[(&str, u64)]) -> (MerchService, Arc<InMemoryLedgerStore>) {
    let store = Arc::new(InMemoryLedgerStore::new());
    seed(store.as_ref(), employees).await;
    let service = MerchService::new(store.clone(), LedgerConfig::default());
    (service, store)
}

pub async fn coins(store: &dyn LedgerStore, username: &str) -> u64 {
    store
        .employee_by_username(username)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{username} not enrolled"))
        .balance
        .coins()
}

/// Writes a commands CSV (header included) to a temporary file.
pub fn commands_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, user, target, amount").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

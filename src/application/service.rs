use super::activity::ActivityAggregator;
use super::purchase::{PurchaseEngine, PurchaseResult};
use super::transfer::{TransferEngine, TransferResult};
use crate::config::LedgerConfig;
use crate::domain::activity::EmployeeActivity;
use crate::domain::catalog::CatalogItem;
use crate::domain::coins::Amount;
use crate::domain::employee::Employee;
use crate::domain::ports::LedgerStoreRef;
use crate::error::Result;
use tracing::info;

/// The ledger core as seen by an authenticated request layer.
///
/// Every operation takes the caller's username as already established by
/// the authentication layer. One store handle is shared by all engines.
pub struct MerchService {
    store: LedgerStoreRef,
    config: LedgerConfig,
    purchases: PurchaseEngine,
    transfers: TransferEngine,
    activity: ActivityAggregator,
}

impl MerchService {
    pub fn new(store: LedgerStoreRef, config: LedgerConfig) -> Self {
        Self {
            purchases: PurchaseEngine::new(store.clone(), &config),
            transfers: TransferEngine::new(store.clone(), &config),
            activity: ActivityAggregator::new(store.clone()),
            store,
            config,
        }
    }

    /// Finds or creates the caller's employee row, granting the configured
    /// starting balance on first sight.
    pub async fn enroll(&self, username: &str, credential_hash: &str) -> Result<Employee> {
        self.store
            .enroll_employee(username, credential_hash, self.config.starting_balance)
            .await
    }

    /// Makes sure every `(name, price)` pair exists in the catalog.
    pub async fn provision_catalog<'a, I>(&self, items: I) -> Result<Vec<CatalogItem>>
    where
        I: IntoIterator<Item = (&'a str, Amount)>,
    {
        let mut provisioned = Vec::new();
        for (name, price) in items {
            provisioned.push(self.store.provision_item(name, price).await?);
        }
        info!(items = provisioned.len(), "catalog provisioned");
        Ok(provisioned)
    }

    pub async fn purchase(&self, caller: &str, item_name: &str) -> Result<PurchaseResult> {
        self.purchases.purchase(caller, item_name).await
    }

    pub async fn transfer(
        &self,
        caller: &str,
        to_user: &str,
        amount: i64,
    ) -> Result<TransferResult> {
        self.transfers.transfer(caller, to_user, amount).await
    }

    pub async fn activity(&self, caller: &str) -> Result<EmployeeActivity> {
        self.activity.activity(caller).await
    }

    /// Current balances of all employees, ordered by id.
    pub async fn employees(&self) -> Result<Vec<Employee>> {
        self.store.employees().await
    }
}

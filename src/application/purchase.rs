use super::unit_of_work::{UnitOfWork, run_atomic};
use crate::config::LedgerConfig;
use crate::domain::catalog::CatalogItem;
use crate::domain::coins::Balance;
use crate::domain::ports::{LedgerStoreRef, LedgerTransaction};
use crate::domain::records::{NewPurchase, PurchaseId};
use crate::error::{LedgerError, PartyRole, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

pub const PURCHASE_SUCCESS_MESSAGE: &str = "purchase successful";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseResult {
    pub message: String,
    pub balance: Balance,
    pub purchase_id: PurchaseId,
}

/// Executes "employee buys catalog item" against the ledger.
pub struct PurchaseEngine {
    store: LedgerStoreRef,
    atomic_timeout: Duration,
}

impl PurchaseEngine {
    pub fn new(store: LedgerStoreRef, config: &LedgerConfig) -> Self {
        Self {
            store,
            atomic_timeout: config.atomic_timeout,
        }
    }

    /// Debits the item's price from `buyer` and records the purchase, atomically.
    ///
    /// The catalog lookup happens up front; the buyer's balance is read and
    /// checked inside the unit that writes it.
    pub async fn purchase(&self, buyer: &str, item_name: &str) -> Result<PurchaseResult> {
        let item = self
            .store
            .catalog_item_by_name(item_name)
            .await?
            .ok_or_else(|| LedgerError::ItemNotFound(item_name.to_string()))?;

        let work = DebitForItem {
            buyer: buyer.to_string(),
            item,
        };
        match run_atomic(self.store.as_ref(), self.atomic_timeout, work).await {
            Ok(result) => {
                info!(buyer, item = item_name, balance = %result.balance, "purchase committed");
                Ok(result)
            }
            Err(err) if err.kind().is_business_rule() => {
                warn!(buyer, item = item_name, error = %err, "purchase rejected");
                Err(err)
            }
            Err(err) => {
                error!(buyer, item = item_name, error = %err, "purchase failed");
                Err(err)
            }
        }
    }
}

struct DebitForItem {
    buyer: String,
    item: CatalogItem,
}

#[async_trait]
impl UnitOfWork for DebitForItem {
    type Output = PurchaseResult;

    async fn run(self, tx: &mut dyn LedgerTransaction) -> Result<PurchaseResult> {
        let employee = tx
            .employee_for_update(&self.buyer)
            .await?
            .ok_or_else(|| LedgerError::EmployeeNotFound {
                role: PartyRole::Employee,
                username: self.buyer.clone(),
            })?;

        let balance = employee
            .balance
            .debit(self.item.price)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                username: employee.username.clone(),
                balance: employee.balance.coins(),
                required: self.item.price.value(),
            })?;

        tx.update_balance(employee.id, balance).await?;
        let record = tx
            .insert_purchase(NewPurchase {
                employee_id: employee.id,
                item_id: self.item.id,
            })
            .await?;

        Ok(PurchaseResult {
            message: PURCHASE_SUCCESS_MESSAGE.to_string(),
            balance,
            purchase_id: record.id,
        })
    }
}

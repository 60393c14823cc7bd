use crate::domain::activity::{
    CatalogCount, CoinHistory, EmployeeActivity, ReceivedEntry, SentEntry,
};
use crate::domain::catalog::ItemId;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::records::{PurchaseRecord, TransferRecord};
use crate::error::{ActivityQuery, LedgerError, PartyRole, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error};

/// Rebuilds an employee's balance, inventory and coin history from the
/// ledger. Never writes.
pub struct ActivityAggregator {
    store: LedgerStoreRef,
}

/// The balance and raw records behind one activity view, all read from the
/// same snapshot.
struct ActivityRecords {
    employee: Employee,
    purchases: Vec<PurchaseRecord>,
    sent: Vec<TransferRecord>,
    received: Vec<TransferRecord>,
}

impl ActivityAggregator {
    pub fn new(store: LedgerStoreRef) -> Self {
        Self { store }
    }

    /// Returns the full activity view, or an error; never a partial view.
    ///
    /// The balance and the records it derives from come from one snapshot,
    /// so `coins` always agrees with the inventory and history.
    pub async fn activity(&self, username: &str) -> Result<EmployeeActivity> {
        let records = self.records(username).await?;

        let mut names = UsernameCache::default();
        let inventory = self
            .inventory(&records.purchases)
            .await
            .map_err(|err| aggregation_failed(ActivityQuery::Inventory, err))?;
        let sent = self
            .sent(&records.sent, &mut names)
            .await
            .map_err(|err| aggregation_failed(ActivityQuery::Sent, err))?;
        let received = self
            .received(&records.received, &mut names)
            .await
            .map_err(|err| aggregation_failed(ActivityQuery::Received, err))?;

        debug!(
            username,
            items = inventory.len(),
            sent = sent.len(),
            received = received.len(),
            "activity aggregated"
        );
        Ok(EmployeeActivity {
            coins: records.employee.balance,
            inventory,
            coin_history: CoinHistory { received, sent },
        })
    }

    /// Reads the employee row and its records under a single snapshot. The
    /// snapshot is released before any name resolution.
    async fn records(&self, username: &str) -> Result<ActivityRecords> {
        let snapshot = self.store.snapshot().await?;
        let employee = snapshot
            .employee_by_username(username)
            .await?
            .ok_or_else(|| LedgerError::EmployeeNotFound {
                role: PartyRole::Employee,
                username: username.to_string(),
            })?;

        let purchases = snapshot
            .purchases_by(employee.id)
            .await
            .map_err(|err| aggregation_failed(ActivityQuery::Inventory, err))?;
        let sent = snapshot
            .transfers_sent_by(employee.id)
            .await
            .map_err(|err| aggregation_failed(ActivityQuery::Sent, err))?;
        let received = snapshot
            .transfers_received_by(employee.id)
            .await
            .map_err(|err| aggregation_failed(ActivityQuery::Received, err))?;
        drop(snapshot);

        Ok(ActivityRecords {
            employee,
            purchases,
            sent,
            received,
        })
    }

    async fn inventory(&self, purchases: &[PurchaseRecord]) -> Result<Vec<CatalogCount>> {
        let mut per_item: HashMap<ItemId, u64> = HashMap::new();
        for purchase in purchases {
            *per_item.entry(purchase.item_id).or_default() += 1;
        }

        let mut per_name = BTreeMap::new();
        for (item_id, quantity) in per_item {
            let item = self
                .store
                .catalog_item_by_id(item_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::storage(format!("purchase references missing item {item_id}"))
                })?;
            *per_name.entry(item.name).or_insert(0) += quantity;
        }

        Ok(per_name
            .into_iter()
            .map(|(item, quantity)| CatalogCount { item, quantity })
            .collect())
    }

    async fn sent(
        &self,
        transfers: &[TransferRecord],
        names: &mut UsernameCache,
    ) -> Result<Vec<SentEntry>> {
        let mut entries = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            entries.push(SentEntry {
                to_user: names.resolve(&self.store, transfer.receiver_id).await?,
                amount: transfer.amount.value(),
            });
        }
        Ok(entries)
    }

    async fn received(
        &self,
        transfers: &[TransferRecord],
        names: &mut UsernameCache,
    ) -> Result<Vec<ReceivedEntry>> {
        let mut entries = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            entries.push(ReceivedEntry {
                from_user: names.resolve(&self.store, transfer.sender_id).await?,
                amount: transfer.amount.value(),
            });
        }
        Ok(entries)
    }
}

fn aggregation_failed(query: ActivityQuery, source: LedgerError) -> LedgerError {
    error!(%query, error = %source, "activity sub-query failed");
    LedgerError::AggregationFailed {
        query,
        source: Box::new(source),
    }
}

/// Counterpart usernames looked up during a single aggregation.
#[derive(Default)]
struct UsernameCache {
    names: HashMap<EmployeeId, String>,
}

impl UsernameCache {
    async fn resolve(&mut self, store: &LedgerStoreRef, id: EmployeeId) -> Result<String> {
        if let Some(name) = self.names.get(&id) {
            return Ok(name.clone());
        }
        let employee = store.employee_by_id(id).await?.ok_or_else(|| {
            LedgerError::storage(format!("transfer references missing employee {id}"))
        })?;
        self.names.insert(id, employee.username.clone());
        Ok(employee.username)
    }
}

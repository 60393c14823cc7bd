use super::coins::Balance;
use serde::Serialize;

/// How many units of one catalog item an employee owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogCount {
    #[serde(rename = "type")]
    pub item: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentEntry {
    pub to_user: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedEntry {
    pub from_user: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoinHistory {
    pub received: Vec<ReceivedEntry>,
    pub sent: Vec<SentEntry>,
}

/// An employee's balance, inventory and coin history, rebuilt from the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeActivity {
    pub coins: Balance,
    pub inventory: Vec<CatalogCount>,
    pub coin_history: CoinHistory,
}

impl EmployeeActivity {
    /// Total number of purchases behind the inventory.
    pub fn items_owned(&self) -> u64 {
        self.inventory.iter().map(|entry| entry.quantity).sum()
    }
}

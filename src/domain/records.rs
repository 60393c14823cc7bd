use super::catalog::ItemId;
use super::coins::Amount;
use super::employee::EmployeeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub u64);

/// Append-only record of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: PurchaseId,
    pub employee_id: EmployeeId,
    pub item_id: ItemId,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a successful coin transfer.
///
/// `sender_id` and `receiver_id` always refer to distinct employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub sender_id: EmployeeId,
    pub receiver_id: EmployeeId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// A purchase about to be written; the store assigns id and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewPurchase {
    pub employee_id: EmployeeId,
    pub item_id: ItemId,
}

/// A transfer about to be written; the store assigns id and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransfer {
    pub sender_id: EmployeeId,
    pub receiver_id: EmployeeId,
    pub amount: Amount,
}

impl NewPurchase {
    pub fn into_record(self, id: PurchaseId) -> PurchaseRecord {
        PurchaseRecord {
            id,
            employee_id: self.employee_id,
            item_id: self.item_id,
            created_at: Utc::now(),
        }
    }
}

impl NewTransfer {
    pub fn into_record(self, id: TransferId) -> TransferRecord {
        TransferRecord {
            id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            amount: self.amount,
            created_at: Utc::now(),
        }
    }
}

use super::coins::Balance;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub u64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An employee holding a coin balance.
///
/// `balance` is a materialized view of the employee's ledger history: it is
/// only ever changed together with the purchase or transfer record that
/// explains the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub username: String,
    /// Opaque credential hash supplied by the authentication layer.
    pub credential_hash: String,
    pub balance: Balance,
}

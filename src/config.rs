use crate::domain::coins::Balance;
use std::time::Duration;

pub const DEFAULT_STARTING_BALANCE: u64 = 1000;
pub const DEFAULT_ATOMIC_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings shared by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Balance given to an employee on enrollment.
    pub starting_balance: Balance,
    /// Upper bound on how long an atomic unit may stay open.
    pub atomic_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: Balance::new(DEFAULT_STARTING_BALANCE),
            atomic_timeout: DEFAULT_ATOMIC_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    pub fn with_starting_balance(mut self, coins: u64) -> Self {
        self.starting_balance = Balance::new(coins);
        self
    }

    pub fn with_atomic_timeout(mut self, timeout: Duration) -> Self {
        self.atomic_timeout = timeout;
        self
    }
}

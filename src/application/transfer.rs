use super::unit_of_work::{UnitOfWork, run_atomic};
use crate::config::LedgerConfig;
use crate::domain::coins::{Amount, Balance};
use crate::domain::employee::Employee;
use crate::domain::ports::{LedgerStoreRef, LedgerTransaction};
use crate::domain::records::{NewTransfer, TransferId};
use crate::error::{LedgerError, PartyRole, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub message: String,
    pub sender_balance: Balance,
    pub receiver_balance: Balance,
    pub transfer_id: TransferId,
}

/// Executes "employee A sends N coins to employee B" against the ledger.
///
/// Every precondition is checked twice: once against committed state to
/// reject obviously bad requests without taking any lock, and again inside
/// the atomic unit, where the rows are held and the check is authoritative.
pub struct TransferEngine {
    store: LedgerStoreRef,
    atomic_timeout: Duration,
}

impl TransferEngine {
    pub fn new(store: LedgerStoreRef, config: &LedgerConfig) -> Self {
        Self {
            store,
            atomic_timeout: config.atomic_timeout,
        }
    }

    pub async fn transfer(
        &self,
        sender: &str,
        receiver: &str,
        amount: i64,
    ) -> Result<TransferResult> {
        let result = self.execute(sender, receiver, amount).await;
        match &result {
            Ok(done) => info!(
                sender,
                receiver,
                amount,
                sender_balance = %done.sender_balance,
                receiver_balance = %done.receiver_balance,
                "transfer committed"
            ),
            Err(err) if err.kind().is_business_rule() => {
                warn!(sender, receiver, amount, error = %err, "transfer rejected")
            }
            Err(err) => error!(sender, receiver, amount, error = %err, "transfer failed"),
        }
        result
    }

    async fn execute(&self, sender: &str, receiver: &str, amount: i64) -> Result<TransferResult> {
        if sender == receiver {
            return Err(LedgerError::SelfTransfer(sender.to_string()));
        }
        let amount = Amount::new(amount)?;

        let from = self
            .store
            .employee_by_username(sender)
            .await?
            .ok_or_else(|| not_found(PartyRole::Sender, sender))?;
        self.store
            .employee_by_username(receiver)
            .await?
            .ok_or_else(|| not_found(PartyRole::Receiver, receiver))?;
        ensure_covers(&from, amount)?;

        let work = MoveCoins {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
        };
        run_atomic(self.store.as_ref(), self.atomic_timeout, work).await
    }
}

fn not_found(role: PartyRole, username: &str) -> LedgerError {
    LedgerError::EmployeeNotFound {
        role,
        username: username.to_string(),
    }
}

fn ensure_covers(employee: &Employee, amount: Amount) -> Result<()> {
    if employee.balance.covers(amount) {
        Ok(())
    } else {
        Err(LedgerError::InsufficientFunds {
            username: employee.username.clone(),
            balance: employee.balance.coins(),
            required: amount.value(),
        })
    }
}

struct MoveCoins {
    sender: String,
    receiver: String,
    amount: Amount,
}

#[async_trait]
impl UnitOfWork for MoveCoins {
    type Output = TransferResult;

    async fn run(self, tx: &mut dyn LedgerTransaction) -> Result<TransferResult> {
        let from = tx
            .employee_for_update(&self.sender)
            .await?
            .ok_or_else(|| not_found(PartyRole::Sender, &self.sender))?;
        let to = tx
            .employee_for_update(&self.receiver)
            .await?
            .ok_or_else(|| not_found(PartyRole::Receiver, &self.receiver))?;
        if from.id == to.id {
            return Err(LedgerError::SelfTransfer(self.sender));
        }

        ensure_covers(&from, self.amount)?;
        let sender_balance = from
            .balance
            .debit(self.amount)
            .ok_or_else(|| LedgerError::InvalidAmount(self.amount.into()))?;
        let receiver_balance = to
            .balance
            .credit(self.amount)
            .ok_or_else(|| LedgerError::InvalidAmount(self.amount.into()))?;

        tx.update_balance(from.id, sender_balance).await?;
        tx.update_balance(to.id, receiver_balance).await?;
        let record = tx
            .insert_transfer(NewTransfer {
                sender_id: from.id,
                receiver_id: to.id,
                amount: self.amount,
            })
            .await?;

        Ok(TransferResult {
            message: format!(
                "transfer successful: sent {} coins to {}; new balances: sender {}, receiver {}",
                self.amount, to.username, sender_balance, receiver_balance
            ),
            sender_balance,
            receiver_balance,
            transfer_id: record.id,
        })
    }
}

use crate::domain::ports::{LedgerStore, LedgerTransaction};
use crate::error::{ErrorKind, LedgerError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};

/// A body of reads and writes that must commit or roll back as one.
#[async_trait]
pub trait UnitOfWork: Send {
    type Output: Send;

    async fn run(self, tx: &mut dyn LedgerTransaction) -> Result<Self::Output>;
}

/// Runs `work` inside a fresh atomic unit of `store`.
///
/// An error from `work` rolls back every write it made. Business-rule
/// rejections are returned unchanged; any other failure while the unit is
/// open comes back as [`LedgerError::TransactionAborted`] wrapping the cause.
/// If opening the unit and running `work` take longer than `timeout`, the
/// unit is dropped (which rolls it back and releases its locks) and
/// [`LedgerError::TimedOut`] is returned. Commit failures surface
/// as [`LedgerError::CommitFailed`]. The unit is attempted exactly once.
pub async fn run_atomic<W: UnitOfWork>(
    store: &dyn LedgerStore,
    timeout: Duration,
    work: W,
) -> Result<W::Output> {
    let body = async {
        let mut tx = store.begin().await.map_err(aborted)?;
        match work.run(tx.as_mut()).await {
            Ok(output) => Ok((tx, output)),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(aborted(err))
            }
        }
    };

    let (tx, output) = match tokio::time::timeout(timeout, body).await {
        Ok(result) => result?,
        Err(_) => {
            error!(?timeout, "atomic unit timed out");
            return Err(LedgerError::TimedOut { after: timeout });
        }
    };

    tx.commit().await.map_err(|err| match err {
        LedgerError::CommitFailed(_) => err,
        other => LedgerError::CommitFailed(other.to_string()),
    })?;
    debug!("atomic unit committed");
    Ok(output)
}

/// Classifies a failure that ended an open unit.
fn aborted(err: LedgerError) -> LedgerError {
    match err.kind() {
        kind if kind.is_business_rule() => err,
        ErrorKind::CommitFailed => err,
        _ => LedgerError::TransactionAborted {
            source: Box::new(err),
        },
    }
}

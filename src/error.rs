use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// The side of an operation an employee lookup was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Employee,
    Sender,
    Receiver,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Employee => write!(f, "employee"),
            PartyRole::Sender => write!(f, "sender"),
            PartyRole::Receiver => write!(f, "receiver"),
        }
    }
}

/// Read-side sub-queries of an activity aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityQuery {
    Inventory,
    Sent,
    Received,
}

impl fmt::Display for ActivityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityQuery::Inventory => write!(f, "inventory"),
            ActivityQuery::Sent => write!(f, "sent history"),
            ActivityQuery::Received => write!(f, "received history"),
        }
    }
}

/// Coarse classification of failures, as seen by the request layer.
///
/// `CommitFailed` means an atomic unit was rolled back by the storage layer
/// and the request may be retried. `Internal` covers faults outside any unit,
/// such as unreadable input files or a failed plain read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientFunds,
    CommitFailed,
    AggregationFailed,
    Internal,
}

impl ErrorKind {
    /// Rejections caused by the request itself rather than by storage.
    pub fn is_business_rule(self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound | ErrorKind::InvalidInput | ErrorKind::InsufficientFunds
        )
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{role} {username} not found")]
    EmployeeNotFound { role: PartyRole, username: String },
    #[error("item {0} not found")]
    ItemNotFound(String),
    #[error("{0} cannot send coins to themselves")]
    SelfTransfer(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),
    #[error("malformed command: {0}")]
    MalformedCommand(String),
    #[error("insufficient funds for {username}: balance {balance}, required {required}")]
    InsufficientFunds {
        username: String,
        balance: u64,
        required: u64,
    },
    #[error("failed to commit ledger transaction: {0}")]
    CommitFailed(String),
    #[error("atomic unit aborted and rolled back: {source}")]
    TransactionAborted {
        #[source]
        source: Box<LedgerError>,
    },
    #[error("atomic unit did not finish within {after:?} and was rolled back")]
    TimedOut { after: Duration },
    #[error("failed to load {query}: {source}")]
    AggregationFailed {
        query: ActivityQuery,
        #[source]
        source: Box<LedgerError>,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        LedgerError::Storage(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::EmployeeNotFound { .. } | LedgerError::ItemNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::SelfTransfer(_)
            | LedgerError::InvalidAmount(_)
            | LedgerError::MalformedCommand(_) => ErrorKind::InvalidInput,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::CommitFailed(_)
            | LedgerError::TransactionAborted { .. }
            | LedgerError::TimedOut { .. } => ErrorKind::CommitFailed,
            LedgerError::AggregationFailed { .. } => ErrorKind::AggregationFailed,
            LedgerError::Csv(_) | LedgerError::Io(_) | LedgerError::Storage(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::storage(err)
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::storage(err)
    }
}

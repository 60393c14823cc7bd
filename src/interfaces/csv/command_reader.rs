use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Enroll,
    Buy,
    Send,
}

/// One raw `op, user, target, amount` row.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRow {
    pub op: CommandKind,
    pub user: String,
    #[serde(default)]
    pub target: String,
    pub amount: Option<i64>,
}

/// A validated ledger command issued on behalf of `user`.
#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Enroll {
        username: String,
        credential_hash: String,
    },
    Buy {
        buyer: String,
        item: String,
    },
    Send {
        sender: String,
        receiver: String,
        amount: i64,
    },
}

impl TryFrom<CommandRow> for Command {
    type Error = LedgerError;

    fn try_from(row: CommandRow) -> Result<Self> {
        if row.user.is_empty() {
            return Err(LedgerError::MalformedCommand("missing user".to_string()));
        }
        match row.op {
            CommandKind::Enroll => Ok(Command::Enroll {
                username: row.user,
                credential_hash: row.target,
            }),
            CommandKind::Buy if row.target.is_empty() => Err(LedgerError::MalformedCommand(
                format!("buy for {} is missing an item", row.user),
            )),
            CommandKind::Buy => Ok(Command::Buy {
                buyer: row.user,
                item: row.target,
            }),
            CommandKind::Send => match row.amount {
                Some(amount) if !row.target.is_empty() => Ok(Command::Send {
                    sender: row.user,
                    receiver: row.target,
                    amount,
                }),
                _ => Err(LedgerError::MalformedCommand(format!(
                    "send from {} needs a receiver and an amount",
                    row.user
                ))),
            },
        }
    }
}

/// Reads ledger commands from a CSV source.
///
/// Whitespace is trimmed and short rows are accepted, so trailing empty
/// columns may be omitted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses and validates each row.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize::<CommandRow>()
            .map(|row| row.map_err(LedgerError::from).and_then(Command::try_from))
    }
}

use crate::domain::employee::Employee;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    username: &'a str,
    coins: u64,
}

/// Writes employee balances as `username,coins` CSV.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_balances(&mut self, employees: &[Employee]) -> Result<()> {
        for employee in employees {
            self.writer.serialize(BalanceRow {
                username: &employee.username,
                coins: employee.balance.coins(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

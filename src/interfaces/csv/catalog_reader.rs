use crate::domain::coins::Amount;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    name: String,
    price: i64,
}

/// Reads a `name, price` catalog file into validated entries.
///
/// Unlike commands, a bad catalog row fails the whole file.
pub fn read_catalog<R: Read>(source: R) -> Result<Vec<(String, Amount)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut items = Vec::new();
    for row in reader.deserialize::<CatalogRow>() {
        let row = row?;
        if row.name.is_empty() {
            return Err(LedgerError::MalformedCommand(
                "catalog item without a name".to_string(),
            ));
        }
        items.push((row.name, Amount::new(row.price)?));
    }
    Ok(items)
}

use super::coins::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A merch item that can be bought with coins. Read-only for the engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub price: Amount,
}

/// The merch shipped with the store, as `(name, price)` pairs.
pub const DEFAULT_CATALOG: &[(&str, i64)] = &[
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_prices_are_positive() {
        for (name, price) in DEFAULT_CATALOG {
            assert!(Amount::new(*price).is_ok(), "{name} has a non-positive price");
        }
    }

    #[test]
    fn test_default_catalog_names_are_unique() {
        let mut names: Vec<_> = DEFAULT_CATALOG.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_CATALOG.len());
    }
}

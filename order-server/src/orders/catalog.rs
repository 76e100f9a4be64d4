//! Product catalog boundary
//!
//! The ledger only needs each product's physical stock; everything else
//! about products lives in the catalog service.

use dashmap::DashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Read access to product stock
pub trait ProductCatalog: Send + Sync {
    /// Physical stock of a product, `None` if the product is unknown
    fn stock(&self, product_id: i64) -> Option<i64>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog seed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Seed file entry: `[{ "productId": 1, "stock": 10 }, ...]`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogSeedEntry {
    product_id: i64,
    stock: i64,
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    stock: DashMap<i64, i64>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(entries: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let catalog = Self::new();
        for (product_id, stock) in entries {
            catalog.set_stock(product_id, stock);
        }
        catalog
    }

    /// Load stock levels from a JSON seed file
    pub fn load_seed(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<CatalogSeedEntry> = serde_json::from_str(&content)?;
        Ok(Self::with_stock(
            entries.into_iter().map(|e| (e.product_id, e.stock)),
        ))
    }

    pub fn set_stock(&self, product_id: i64, stock: i64) {
        self.stock.insert(product_id, stock.max(0));
    }

    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn stock(&self, product_id: i64) -> Option<i64> {
        self.stock.get(&product_id).map(|s| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_with_stock() {
        let catalog = InMemoryCatalog::with_stock([(1, 10), (2, 5)]);
        assert_eq!(catalog.stock(1), Some(10));
        assert_eq!(catalog.stock(2), Some(5));
        assert_eq!(catalog.stock(3), None);

        catalog.set_stock(2, -4);
        assert_eq!(catalog.stock(2), Some(0));
    }

    #[test]
    fn test_load_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"productId": 1, "stock": 10}}, {{"productId": 2, "stock": 3}}]"#
        )
        .unwrap();

        let catalog = InMemoryCatalog::load_seed(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.stock(2), Some(3));
    }

    #[test]
    fn test_load_seed_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            InMemoryCatalog::load_seed(file.path()),
            Err(CatalogError::Parse(_))
        ));
        assert!(matches!(
            InMemoryCatalog::load_seed("/nonexistent/catalog.json"),
            Err(CatalogError::Io(_))
        ));
    }
}

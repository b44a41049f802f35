use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::index::SkuIndex;
use crate::core::product::{Product, TestItem};
use crate::core::requirement::json_kind;
use crate::core::types::Sku;
use crate::parsing::delimited::{self, ParseError};
use crate::utils::validation::{check_row_limit, parse_amount, MAX_CATALOG_ROWS};

/// Relation names used in error messages
pub const PRODUCTS_RELATION: &str = "products";
pub const TESTS_RELATION: &str = "tests";
/// Price attribute of the product relation
pub const PRICE_COLUMN: &str = "unit_price";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid catalog table: {0}")]
    TableError(ParseError),

    #[error("Catalog relation '{relation}' is missing column '{column}'")]
    MissingColumn {
        relation: &'static str,
        column: &'static str,
    },

    #[error("Duplicate SKU in catalog: {0}")]
    DuplicateSku(Sku),

    #[error("Invalid catalog entry: {0}")]
    InvalidEntry(String),

    #[error("Too many rows in relation '{0}' (maximum {MAX_CATALOG_ROWS})")]
    TooManyRows(&'static str),

    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// Whether this error describes a structural defect in the catalog
    /// (a missing column) rather than an unreadable store.
    #[must_use]
    pub fn missing_column(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::MissingColumn { relation, column } => Some((*relation, *column)),
            _ => None,
        }
    }

    fn from_table(relation: &'static str, err: ParseError) -> Self {
        match err {
            ParseError::Io(e) => Self::ReadError(e),
            ParseError::MissingColumn(column) => Self::MissingColumn { relation, column },
            ParseError::TooManyRows(_) => Self::TooManyRows(relation),
            other @ ParseError::InvalidFormat(_) => Self::TableError(other),
        }
    }
}

/// Catalog version for compatibility checking
pub const CATALOG_VERSION: &str = "1.0.0";

/// Serializable catalog format
#[derive(Debug, Clone, Serialize)]
pub struct CatalogData {
    pub version: String,
    pub created_at: String,
    pub products: Vec<Product>,
    pub tests: Vec<TestItem>,
}

/// Catalog format as read from disk, before validation
#[derive(Debug, Deserialize)]
struct RawCatalogData {
    version: String,
    #[serde(default)]
    products: Vec<RawProduct>,
    #[serde(default)]
    tests: Vec<RawTest>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    sku: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    /// Outer `None`: key absent. Inner `None`: explicit null.
    #[serde(default, deserialize_with = "present")]
    unit_price: Option<Option<RawAmount>>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    name: String,
    #[serde(default, deserialize_with = "present")]
    cost: Option<Option<RawAmount>>,
}

/// A price or cost: a JSON number, or text such as `"NaN"` or `"1100"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn resolve(self) -> Result<Option<f64>, String> {
        match self {
            Self::Number(n) => Ok(Some(n)),
            Self::Text(s) => parse_amount(&s),
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// An immutable, internally consistent view of both catalog relations.
///
/// A snapshot is what the matcher and the pricing calculator operate on. It
/// is taken once per pipeline run and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
    tests: Vec<TestItem>,
    has_price_column: bool,
    sku_index: SkuIndex,
}

impl CatalogSnapshot {
    /// Build a snapshot whose product relation carries a price column.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateSku` if two products share a SKU, or
    /// `CatalogError::TooManyRows` if a relation exceeds the row limit.
    pub fn new(products: Vec<Product>, tests: Vec<TestItem>) -> Result<Self, CatalogError> {
        if products.len() > MAX_CATALOG_ROWS {
            return Err(CatalogError::TooManyRows(PRODUCTS_RELATION));
        }
        if tests.len() > MAX_CATALOG_ROWS {
            return Err(CatalogError::TooManyRows(TESTS_RELATION));
        }
        let sku_index = SkuIndex::build(&products).map_err(CatalogError::DuplicateSku)?;
        Ok(Self {
            products,
            tests,
            has_price_column: true,
            sku_index,
        })
    }

    /// An empty catalog
    #[must_use]
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            tests: Vec::new(),
            has_price_column: true,
            sku_index: SkuIndex::default(),
        }
    }

    /// Mark whether the product relation has a price column
    #[must_use]
    pub fn with_price_column(mut self, present: bool) -> Self {
        self.has_price_column = present;
        self
    }

    /// Load the embedded sample catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is invalid (checked by the build script).
    pub fn load_embedded() -> Result<Self, CatalogError> {
        // Embedded at compile time via build.rs
        const EMBEDDED_CATALOG: &str = include_str!("../../catalogs/cable_catalog.json");
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file cannot be read, or a
    /// parse/validation error from [`CatalogSnapshot::from_json`].
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load catalog from delimited product and test tables
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingColumn` for tables without their key
    /// columns, and read or format errors otherwise.
    pub fn load_from_tables(
        products_path: &Path,
        tests_path: &Path,
        delimiter: char,
    ) -> Result<Self, CatalogError> {
        let table = delimited::parse_product_file(products_path, delimiter)
            .map_err(|e| CatalogError::from_table(PRODUCTS_RELATION, e))?;
        let tests = delimited::parse_test_file(tests_path, delimiter)
            .map_err(|e| CatalogError::from_table(TESTS_RELATION, e))?;

        Ok(Self::new(table.products, tests)?.with_price_column(table.has_price_column))
    }

    /// Parse catalog from JSON string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` for malformed JSON,
    /// `CatalogError::InvalidEntry` for bad attribute values or amounts,
    /// `CatalogError::MissingColumn` if tests exist but none carries a cost,
    /// and the errors of [`CatalogSnapshot::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: RawCatalogData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != CATALOG_VERSION {
            warn!(
                "Catalog version mismatch (expected {}, found {})",
                CATALOG_VERSION, data.version
            );
        }

        let has_price_column =
            data.products.is_empty() || data.products.iter().any(|p| p.unit_price.is_some());
        if !data.tests.is_empty() && data.tests.iter().all(|t| t.cost.is_none()) {
            return Err(CatalogError::MissingColumn {
                relation: TESTS_RELATION,
                column: "cost",
            });
        }

        let mut products = Vec::with_capacity(data.products.len());
        for raw in data.products {
            if check_row_limit(products.len()).is_some() {
                return Err(CatalogError::TooManyRows(PRODUCTS_RELATION));
            }
            products.push(raw.into_product()?);
        }

        let mut tests = Vec::with_capacity(data.tests.len());
        for raw in data.tests {
            if check_row_limit(tests.len()).is_some() {
                return Err(CatalogError::TooManyRows(TESTS_RELATION));
            }
            tests.push(raw.into_test()?);
        }

        debug!(
            "Parsed catalog with {} products and {} tests",
            products.len(),
            tests.len()
        );
        Ok(Self::new(products, tests)?.with_price_column(has_price_column))
    }

    /// Export catalog to JSON
    ///
    /// A product relation without a price column cannot be written: the JSON
    /// format has no way to tell it apart from rows with null prices.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingColumn` if the product relation has no
    /// price column, or `CatalogError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        if !self.has_price_column {
            return Err(CatalogError::MissingColumn {
                relation: PRODUCTS_RELATION,
                column: PRICE_COLUMN,
            });
        }
        let data = CatalogData {
            version: CATALOG_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            products: self.products.clone(),
            tests: self.tests.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Products in catalog order
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn tests(&self) -> &[TestItem] {
        &self.tests
    }

    /// Whether the product relation carries a price column at all
    #[must_use]
    pub fn has_price_column(&self) -> bool {
        self.has_price_column
    }

    /// Get a product by SKU
    #[must_use]
    pub fn get(&self, sku: &Sku) -> Option<&Product> {
        self.sku_index.position(sku).map(|idx| &self.products[idx])
    }

    /// Number of products in catalog
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if catalog has no products
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl RawProduct {
    fn into_product(self) -> Result<Product, CatalogError> {
        let sku = self.sku.trim();
        if sku.is_empty() {
            return Err(CatalogError::InvalidEntry("product with empty sku".to_string()));
        }

        let unit_price = match self.unit_price.flatten() {
            Some(amount) => amount.resolve().map_err(|bad| {
                CatalogError::InvalidEntry(format!("product '{sku}' has invalid price '{bad}'"))
            })?,
            None => None,
        };

        let mut product = Product::new(sku, unit_price);
        product.name = self.name;
        for (key, value) in self.attributes {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => continue,
                other => {
                    return Err(CatalogError::InvalidEntry(format!(
                        "product '{sku}' attribute '{key}' is a {}",
                        json_kind(&other)
                    )))
                }
            };
            product.attributes.insert(key, text);
        }
        Ok(product)
    }
}

impl RawTest {
    fn into_test(self) -> Result<TestItem, CatalogError> {
        let cost = match self.cost.flatten() {
            Some(amount) => amount.resolve().map_err(|bad| {
                CatalogError::InvalidEntry(format!("test '{}' has invalid cost '{bad}'", self.name))
            })?,
            None => None,
        };
        let cost = cost.unwrap_or_else(|| {
            warn!("Test '{}' has no cost", self.name);
            0.0
        });
        Ok(TestItem::new(self.name, cost))
    }
}

/// Read access to a catalog.
///
/// Implementations must hand out a consistent snapshot: all rows of both
/// relations as of one point in time.
pub trait CatalogStore: Send + Sync {
    /// Take a snapshot of the catalog
    ///
    /// # Errors
    ///
    /// Returns a `CatalogError` if the backing store cannot be read.
    fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError>;
}

/// A store over a snapshot already held in memory
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    snapshot: Arc<CatalogSnapshot>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

impl From<CatalogSnapshot> for InMemoryCatalog {
    fn from(snapshot: CatalogSnapshot) -> Self {
        Self::new(snapshot)
    }
}

impl CatalogStore for InMemoryCatalog {
    fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        Ok(Arc::clone(&self.snapshot))
    }
}

/// A store backed by a JSON catalog file, re-read on every snapshot
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogStore for JsonFileCatalog {
    fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        CatalogSnapshot::load_from_file(&self.path).map(Arc::new)
    }
}

/// A store backed by delimited product and test tables, re-read on every snapshot
#[derive(Debug, Clone)]
pub struct TableCatalog {
    products_path: PathBuf,
    tests_path: PathBuf,
    delimiter: char,
}

impl TableCatalog {
    pub fn new(
        products_path: impl Into<PathBuf>,
        tests_path: impl Into<PathBuf>,
        delimiter: char,
    ) -> Self {
        Self {
            products_path: products_path.into(),
            tests_path: tests_path.into(),
            delimiter,
        }
    }
}

impl CatalogStore for TableCatalog {
    fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        CatalogSnapshot::load_from_tables(&self.products_path, &self.tests_path, self.delimiter)
            .map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_catalog() {
        let catalog = CatalogSnapshot::load_embedded().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.has_price_column());
        assert!(!catalog.tests().is_empty());
    }

    #[test]
    fn test_catalog_get_by_sku() {
        let catalog = CatalogSnapshot::load_embedded().unwrap();
        let cu = catalog.get(&Sku::new("SKU-CU-XLPE-SWA"));
        assert!(cu.is_some());
        assert_eq!(cu.unwrap().attribute("ConductorMaterial"), "Copper");
        assert!(catalog.get(&Sku::new("nonexistent")).is_none());
    }

    #[test]
    fn test_catalog_to_json_round_trip() {
        let catalog = CatalogSnapshot::load_embedded().unwrap();
        let json = catalog.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"products\""));

        let reloaded = CatalogSnapshot::from_json(&json).unwrap();
        assert_eq!(reloaded.products(), catalog.products());
        assert_eq!(reloaded.tests(), catalog.tests());
    }

    #[test]
    fn test_export_refuses_catalog_without_price_column() {
        let catalog = CatalogSnapshot::new(
            vec![Product::new("A", None).with_attribute("VoltageRating", "1.1 kV")],
            vec![TestItem::new("Load Test", 100.0)],
        )
        .unwrap()
        .with_price_column(false);

        let err = catalog.to_json().unwrap_err();
        assert_eq!(err.missing_column(), Some((PRODUCTS_RELATION, PRICE_COLUMN)));

        let empty = CatalogSnapshot::empty().with_price_column(false);
        assert!(empty.to_json().is_err());
    }

    #[test]
    fn test_null_prices_survive_export() {
        let catalog = CatalogSnapshot::new(
            vec![Product::new("A", None), Product::new("B", Some(5.0))],
            Vec::new(),
        )
        .unwrap();
        let reloaded = CatalogSnapshot::from_json(&catalog.to_json().unwrap()).unwrap();
        assert!(reloaded.has_price_column());
        assert_eq!(reloaded.products()[0].unit_price, None);
        assert_eq!(reloaded.products()[1].unit_price, Some(5.0));
    }

    #[test]
    fn test_missing_price_key_means_no_price_column() {
        let json = r#"{
            "version": "1.0.0",
            "products": [{"sku": "A", "attributes": {"VoltageRating": "1.1 kV"}}],
            "tests": []
        }"#;
        let catalog = CatalogSnapshot::from_json(json).unwrap();
        assert!(!catalog.has_price_column());
    }

    #[test]
    fn test_null_price_keeps_price_column() {
        let json = r#"{
            "version": "1.0.0",
            "products": [
                {"sku": "A", "unit_price": null},
                {"sku": "B", "unit_price": "NaN"},
                {"sku": "C", "unit_price": 10}
            ]
        }"#;
        let catalog = CatalogSnapshot::from_json(json).unwrap();
        assert!(catalog.has_price_column());
        assert_eq!(catalog.products()[0].unit_price, None);
        assert!(catalog.products()[1].unit_price.unwrap().is_nan());
        assert_eq!(catalog.products()[2].unit_price, Some(10.0));
    }

    #[test]
    fn test_numeric_attributes_are_stringified() {
        let json = r#"{
            "version": "1.0.0",
            "products": [{"sku": "A", "unit_price": 1, "attributes": {"Cores": 4, "Colour": null}}]
        }"#;
        let catalog = CatalogSnapshot::from_json(json).unwrap();
        let product = &catalog.products()[0];
        assert_eq!(product.attribute("Cores"), "4");
        assert!(!product.attributes.contains_key("Colour"));
    }

    #[test]
    fn test_tests_without_cost_is_missing_column() {
        let json = r#"{"version": "1.0.0", "tests": [{"name": "Load Test"}]}"#;
        let err = CatalogSnapshot::from_json(json).unwrap_err();
        assert_eq!(err.missing_column(), Some((TESTS_RELATION, "cost")));
    }

    #[test]
    fn test_duplicate_sku_rejected() {
        let err = CatalogSnapshot::new(
            vec![Product::new("A", Some(1.0)), Product::new("A", Some(2.0))],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSku(_)));
    }

    #[test]
    fn test_json_file_store_missing_file() {
        let store = JsonFileCatalog::new("/nonexistent/catalog.json");
        assert!(matches!(store.snapshot(), Err(CatalogError::ReadError(_))));
    }

    #[test]
    fn test_in_memory_store_shares_snapshot() {
        let store = InMemoryCatalog::new(CatalogSnapshot::empty());
        let a = store.snapshot().unwrap();
        let b = store.snapshot().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::Sku;

/// A sellable product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Primary key
    pub sku: Sku,

    /// Display name (`ProductName` in tabular catalogs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Descriptive attributes such as `VoltageRating` or `ConductorMaterial`.
    /// Values are stored as loaded; matching normalizes them on comparison.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Unit price. `None` when the catalog row has no usable price.
    /// May hold a non-finite value if the source did.
    pub unit_price: Option<f64>,
}

impl Product {
    pub fn new(sku: impl Into<String>, unit_price: Option<f64>) -> Self {
        Self {
            sku: Sku::new(sku),
            name: None,
            attributes: BTreeMap::new(),
            unit_price,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attribute value, or `""` when the product does not carry it
    #[must_use]
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map_or("", String::as_str)
    }

    /// Name for display, falling back to the SKU
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.sku.as_str())
    }
}

/// A test or compliance item with a flat cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub name: String,
    pub cost: f64,
}

impl TestItem {
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            name: name.into(),
            cost,
        }
    }
}

use std::collections::HashMap;

use crate::core::product::Product;
use crate::core::types::Sku;

/// Index: SKU -> position in the snapshot's product list
#[derive(Debug, Clone, Default)]
pub struct SkuIndex {
    positions: HashMap<Sku, usize>,
}

impl SkuIndex {
    /// Build the index. Returns the first duplicated SKU if keys collide.
    pub fn build(products: &[Product]) -> Result<Self, Sku> {
        let mut positions = HashMap::with_capacity(products.len());
        for (i, product) in products.iter().enumerate() {
            if positions.insert(product.sku.clone(), i).is_some() {
                return Err(product.sku.clone());
            }
        }
        Ok(Self { positions })
    }

    #[must_use]
    pub fn position(&self, sku: &Sku) -> Option<usize> {
        self.positions.get(sku).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

use serde::Serialize;

use crate::core::product::Product;
use crate::core::requirement::Requirement;
use crate::utils::validation::{count_to_f64, normalize_value};

/// Attribute overlap between one requirement and one product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeScore {
    /// Requirement fields whose normalized value equals the product's
    pub matched: usize,

    /// Number of requirement fields
    pub total: usize,
}

impl AttributeScore {
    /// Count the requirement fields the product satisfies.
    ///
    /// A field the product does not carry compares against `""` and therefore
    /// only matches an empty required value.
    #[must_use]
    pub fn calculate(requirement: &Requirement, product: &Product) -> Self {
        let matched = requirement
            .fields
            .iter()
            .filter(|(key, required)| normalize_value(product.attribute(key)) == **required)
            .count();

        Self {
            matched,
            total: requirement.fields.len(),
        }
    }

    /// Score as a percentage in `[0, 100]`; `0` when there are no fields
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * count_to_f64(self.matched) / count_to_f64(self.total)
        }
    }
}

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::store::{CatalogError, CatalogSnapshot, CatalogStore, PRODUCTS_RELATION};
use crate::core::types::Sku;
use crate::matching::engine::MatchResult;
use crate::pricing::policy::{TestCostPolicy, UniformAggregateTestCost};
use crate::utils::validation::sanitize;

pub use crate::catalog::store::PRICE_COLUMN;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("No match results to price")]
    EmptyInput,

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(CatalogError),

    #[error("Catalog schema mismatch: relation '{relation}' has no '{column}' column")]
    SchemaMismatch {
        relation: &'static str,
        column: &'static str,
    },

    #[error("Test cost policy '{policy}' returned {got} costs for {expected} items")]
    PolicyMismatch {
        policy: &'static str,
        expected: usize,
        got: usize,
    },
}

impl From<CatalogError> for PricingError {
    fn from(err: CatalogError) -> Self {
        match err.missing_column() {
            Some((relation, column)) => Self::SchemaMismatch { relation, column },
            None => Self::CatalogUnavailable(err),
        }
    }
}

/// A match result with its price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedItem {
    pub item_label: String,
    pub recommended_sku: Option<Sku>,
    pub match_score: f64,

    /// Catalog unit price; `0` for unmatched or unknown SKUs and null prices
    pub unit_price: f64,

    /// Test and compliance cost charged to this item
    pub test_cost: f64,

    /// `unit_price + test_cost`
    pub total_cost: f64,
}

/// Joins match results with catalog prices and test costs.
///
/// Pricing is all-or-nothing: any failure rejects the whole batch. Every
/// number in the output is finite.
pub struct PricingCalculator {
    policy: Box<dyn TestCostPolicy>,
}

impl PricingCalculator {
    /// Calculator using the uniform aggregate test cost policy
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Box::new(UniformAggregateTestCost))
    }

    #[must_use]
    pub fn with_policy(policy: Box<dyn TestCostPolicy>) -> Self {
        Self { policy }
    }

    /// Name of the active test cost policy
    #[must_use]
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Price a batch of match results, reading the catalog from a store.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::EmptyInput` for an empty batch,
    /// `PricingError::CatalogUnavailable` if the store cannot be read, and
    /// `PricingError::SchemaMismatch` if the product relation has no price
    /// column or a relation is missing a required column.
    pub fn price(
        &self,
        matches: &[MatchResult],
        store: &dyn CatalogStore,
    ) -> Result<Vec<PricedItem>, PricingError> {
        if matches.is_empty() {
            return Err(PricingError::EmptyInput);
        }
        let snapshot = store.snapshot()?;
        self.price_snapshot(matches, &snapshot)
    }

    /// Price a batch of match results against a snapshot already taken.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::EmptyInput` for an empty batch,
    /// `PricingError::SchemaMismatch` if the product relation has no price
    /// column, and `PricingError::PolicyMismatch` if the test cost policy does
    /// not return exactly one cost per item.
    pub fn price_snapshot(
        &self,
        matches: &[MatchResult],
        snapshot: &CatalogSnapshot,
    ) -> Result<Vec<PricedItem>, PricingError> {
        if matches.is_empty() {
            return Err(PricingError::EmptyInput);
        }
        if !snapshot.has_price_column() {
            return Err(PricingError::SchemaMismatch {
                relation: PRODUCTS_RELATION,
                column: PRICE_COLUMN,
            });
        }

        let test_costs = self.policy.assign(matches, snapshot.tests());
        if test_costs.len() != matches.len() {
            return Err(PricingError::PolicyMismatch {
                policy: self.policy.name(),
                expected: matches.len(),
                got: test_costs.len(),
            });
        }

        let items: Vec<PricedItem> = matches
            .iter()
            .zip(test_costs)
            .map(|(m, test_cost)| {
                let unit_price = sanitize(lookup_price(snapshot, m.recommended_sku.as_ref()));
                let test_cost = sanitize(test_cost);
                PricedItem {
                    item_label: m.item_label.clone(),
                    recommended_sku: m.recommended_sku.clone(),
                    match_score: sanitize(m.match_score),
                    unit_price,
                    test_cost,
                    total_cost: sanitize(unit_price + test_cost),
                }
            })
            .collect();

        debug!(
            "Priced {} items using {} policy",
            items.len(),
            self.policy.name()
        );
        Ok(items)
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Left join on SKU: unknown SKUs and null prices count as `0`
fn lookup_price(snapshot: &CatalogSnapshot, sku: Option<&Sku>) -> f64 {
    let Some(sku) = sku else {
        return 0.0;
    };
    match snapshot.get(sku) {
        Some(product) => product.unit_price.unwrap_or(0.0),
        None => {
            warn!("Recommended SKU {sku} not found in catalog; pricing at 0");
            0.0
        }
    }
}

/// Price match results with the default calculator
///
/// # Errors
///
/// See [`PricingCalculator::price`].
pub fn price(
    matches: &[MatchResult],
    store: &dyn CatalogStore,
) -> Result<Vec<PricedItem>, PricingError> {
    PricingCalculator::new().price(matches, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::InMemoryCatalog;
    use crate::core::product::{Product, TestItem};
    use std::sync::Arc;

    struct UnreadableStore;

    impl CatalogStore for UnreadableStore {
        fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
            Err(CatalogError::Unavailable("backing store missing".to_string()))
        }
    }

    fn matched(label: &str, sku: Option<&str>, score: f64) -> MatchResult {
        MatchResult {
            item_label: label.to_string(),
            recommended_sku: sku.map(Sku::new),
            match_score: score,
            matched_fields: 0,
            total_fields: 0,
        }
    }

    fn standard_tests() -> Vec<TestItem> {
        vec![
            TestItem::new("Load Test", 200.0),
            TestItem::new("Performance Test", 300.0),
            TestItem::new("Compliance Test", 150.0),
        ]
    }

    fn store(products: Vec<Product>, tests: Vec<TestItem>) -> InMemoryCatalog {
        InMemoryCatalog::new(CatalogSnapshot::new(products, tests).unwrap())
    }

    #[test]
    fn test_total_is_unit_price_plus_aggregate_test_cost() {
        let store = store(vec![Product::new("SKU001", Some(1200.0))], standard_tests());
        let items = price(&[matched("Item 1", Some("SKU001"), 100.0)], &store).unwrap();

        assert_eq!(items.len(), 1);
        assert!((items[0].unit_price - 1200.0).abs() < f64::EPSILON);
        assert!((items[0].test_cost - 650.0).abs() < f64::EPSILON);
        assert!((items[0].total_cost - 1850.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_sku_prices_at_zero() {
        let store = store(vec![Product::new("SKU001", Some(1200.0))], standard_tests());
        let items = price(
            &[
                matched("Item 1", Some("SKU999"), 50.0),
                matched("Item 2", None, 0.0),
            ],
            &store,
        )
        .unwrap();

        for item in &items {
            assert!(item.unit_price.abs() < f64::EPSILON);
            assert!((item.total_cost - item.test_cost).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_null_price_prices_at_zero() {
        let store = store(vec![Product::new("SKU001", None)], standard_tests());
        let items = price(&[matched("Item 1", Some("SKU001"), 100.0)], &store).unwrap();
        assert!((items[0].total_cost - 650.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_prices_are_sanitized() {
        let store = store(
            vec![
                Product::new("NAN", Some(f64::NAN)),
                Product::new("INF", Some(f64::INFINITY)),
                Product::new("NEG", Some(f64::NEG_INFINITY)),
            ],
            standard_tests(),
        );
        let items = price(
            &[
                matched("Item 1", Some("NAN"), 100.0),
                matched("Item 2", Some("INF"), 100.0),
                matched("Item 3", Some("NEG"), 100.0),
            ],
            &store,
        )
        .unwrap();

        for item in &items {
            assert!(item.unit_price.is_finite());
            assert!(item.unit_price.abs() < f64::EPSILON);
            assert!((item.total_cost - (item.test_cost + 0.0)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_overflowing_total_is_sanitized() {
        let store = store(
            vec![Product::new("BIG", Some(f64::MAX))],
            vec![TestItem::new("Huge", f64::MAX)],
        );
        let items = price(&[matched("Item 1", Some("BIG"), 100.0)], &store).unwrap();
        assert!(items[0].total_cost.is_finite());
    }

    #[test]
    fn test_empty_test_relation() {
        let store = store(vec![Product::new("A", Some(10.0))], Vec::new());
        let items = price(&[matched("Item 1", Some("A"), 100.0)], &store).unwrap();
        assert!(items[0].test_cost.abs() < f64::EPSILON);
        assert!((items[0].total_cost - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_input_rejected() {
        let store = store(Vec::new(), Vec::new());
        assert!(matches!(price(&[], &store), Err(PricingError::EmptyInput)));
    }

    #[test]
    fn test_unreadable_catalog_fails_whole_batch() {
        let batch: Vec<MatchResult> = (1..=5)
            .map(|i| matched(&format!("Item {i}"), Some("SKU001"), 100.0))
            .collect();
        let result = price(&batch, &UnreadableStore);
        assert!(matches!(result, Err(PricingError::CatalogUnavailable(_))));
    }

    #[test]
    fn test_missing_price_column_is_schema_mismatch() {
        let snapshot = CatalogSnapshot::new(vec![Product::new("A", None)], standard_tests())
            .unwrap()
            .with_price_column(false);
        let store = InMemoryCatalog::new(snapshot);
        let err = price(&[matched("Item 1", Some("A"), 100.0)], &store).unwrap_err();
        assert!(matches!(
            err,
            PricingError::SchemaMismatch {
                relation: "products",
                column: PRICE_COLUMN
            }
        ));
        assert!(err.to_string().contains("schema mismatch"));
    }

    #[test]
    fn test_missing_column_error_maps_to_schema_mismatch() {
        let err = PricingError::from(CatalogError::MissingColumn {
            relation: "tests",
            column: "TestCost",
        });
        assert!(matches!(err, PricingError::SchemaMismatch { .. }));

        let err = PricingError::from(CatalogError::Unavailable("gone".to_string()));
        assert!(matches!(err, PricingError::CatalogUnavailable(_)));
    }

    struct FixedCosts(Vec<f64>);

    impl TestCostPolicy for FixedCosts {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn assign(&self, _items: &[MatchResult], _tests: &[TestItem]) -> Vec<f64> {
            self.0.clone()
        }
    }

    #[test]
    fn test_policy_cost_count_must_match_batch() {
        let snapshot =
            CatalogSnapshot::new(vec![Product::new("A", Some(10.0))], standard_tests()).unwrap();
        let batch: Vec<MatchResult> = (1..=3)
            .map(|i| matched(&format!("Item {i}"), Some("A"), 100.0))
            .collect();

        for costs in [vec![1.0], vec![1.0; 4]] {
            let got = costs.len();
            let calculator = PricingCalculator::with_policy(Box::new(FixedCosts(costs)));
            let err = calculator.price_snapshot(&batch, &snapshot).unwrap_err();
            assert!(matches!(
                err,
                PricingError::PolicyMismatch { policy: "fixed", expected: 3, got: g } if g == got
            ));
        }

        let calculator = PricingCalculator::with_policy(Box::new(FixedCosts(vec![1.0, 2.0, 3.0])));
        let items = calculator.price_snapshot(&batch, &snapshot).unwrap();
        assert_eq!(items.len(), 3);
        assert!((items[2].total_cost - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_order_preserved() {
        let store = store(
            vec![Product::new("A", Some(1.0)), Product::new("B", Some(2.0))],
            Vec::new(),
        );
        let items = price(
            &[
                matched("Item 1", Some("B"), 100.0),
                matched("Item 2", Some("A"), 100.0),
            ],
            &store,
        )
        .unwrap();
        let labels: Vec<&str> = items.iter().map(|i| i.item_label.as_str()).collect();
        assert_eq!(labels, vec!["Item 1", "Item 2"]);
        assert!((items[0].unit_price - 2.0).abs() < f64::EPSILON);
    }
}

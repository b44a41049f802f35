use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::product::Product;
use crate::core::requirement::{Requirement, RequirementSet};
use crate::core::types::{MatchQuality, Sku};
use crate::matching::scoring::AttributeScore;

/// Result of matching one requirement against the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// `"Item {index}"` of the requirement
    pub item_label: String,

    /// Best-scoring product, or `None` if nothing qualified
    pub recommended_sku: Option<Sku>,

    /// Percentage in `[0, 100]`
    pub match_score: f64,

    /// Requirement fields satisfied by the recommended product
    pub matched_fields: usize,

    /// Number of requirement fields
    pub total_fields: usize,
}

impl MatchResult {
    /// A result with no recommendation and a zero score
    #[must_use]
    pub fn no_match(requirement: &Requirement) -> Self {
        Self {
            item_label: requirement.label(),
            recommended_sku: None,
            match_score: 0.0,
            matched_fields: 0,
            total_fields: requirement.fields.len(),
        }
    }

    #[must_use]
    pub fn quality(&self) -> MatchQuality {
        MatchQuality::from_score(self.match_score, self.recommended_sku.is_some())
    }
}

/// Minimum score (percent) a product needs to be recommended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "score")]
pub enum ScoreThreshold {
    /// Score must be strictly greater than the value
    Above(f64),
    /// Score must be greater than or equal to the value
    AtLeast(f64),
}

impl ScoreThreshold {
    #[must_use]
    pub fn admits(&self, score: f64) -> bool {
        match *self {
            Self::Above(min) => score > min,
            Self::AtLeast(min) => score >= min,
        }
    }
}

impl Default for ScoreThreshold {
    /// A product with no overlapping attributes is never recommended
    fn default() -> Self {
        Self::Above(0.0)
    }
}

/// Configuration for the matcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum score for a product to be recommended
    pub threshold: ScoreThreshold,
}

/// A scored catalog product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub sku: Sku,
    pub score: AttributeScore,
    pub match_score: f64,
}

/// Selects the best catalog product for each requirement.
///
/// Products are scanned in catalog order and a product only displaces the
/// current best with a strictly higher score, so ties resolve to the earliest
/// product. Scores are compared as integer match counts.
pub struct Matcher<'a> {
    products: &'a [Product],
    config: MatchingConfig,
}

impl<'a> Matcher<'a> {
    /// Create a matcher with default configuration
    #[must_use]
    pub fn new(products: &'a [Product]) -> Self {
        Self {
            products,
            config: MatchingConfig::default(),
        }
    }

    /// Create a matcher with custom configuration
    #[must_use]
    pub fn with_config(products: &'a [Product], config: MatchingConfig) -> Self {
        Self { products, config }
    }

    /// Match every requirement, preserving order
    #[must_use]
    pub fn match_requirements(&self, requirements: &RequirementSet) -> Vec<MatchResult> {
        requirements.iter().map(|r| self.match_one(r)).collect()
    }

    /// Select the best product for a single requirement
    #[must_use]
    pub fn match_one(&self, requirement: &Requirement) -> MatchResult {
        if requirement.fields.is_empty() || self.products.is_empty() {
            return MatchResult::no_match(requirement);
        }

        let mut best: Option<(&Product, AttributeScore)> = None;
        for product in self.products {
            let score = AttributeScore::calculate(requirement, product);
            if !self.config.threshold.admits(score.percent()) {
                continue;
            }
            if best.map_or(true, |(_, b)| score.matched > b.matched) {
                best = Some((product, score));
            }
        }

        let result = match best {
            Some((product, score)) => MatchResult {
                item_label: requirement.label(),
                recommended_sku: Some(product.sku.clone()),
                match_score: score.percent(),
                matched_fields: score.matched,
                total_fields: score.total,
            },
            None => MatchResult::no_match(requirement),
        };

        debug!(
            "{}: {} ({:.1}%)",
            result.item_label,
            result
                .recommended_sku
                .as_ref()
                .map_or("no match", Sku::as_str),
            result.match_score
        );
        result
    }

    /// All products ranked by score, best first, ties in catalog order.
    ///
    /// Unlike [`Matcher::match_one`] this ignores the threshold; it is meant
    /// for showing alternatives.
    #[must_use]
    pub fn rank(&self, requirement: &Requirement, limit: usize) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .products
            .iter()
            .map(|product| {
                let score = AttributeScore::calculate(requirement, product);
                Candidate {
                    sku: product.sku.clone(),
                    match_score: score.percent(),
                    score,
                }
            })
            .collect();

        // Stable sort keeps catalog order among equal scores
        candidates.sort_by(|a, b| b.score.matched.cmp(&a.score.matched));
        candidates.truncate(limit);
        candidates
    }
}

/// Match requirements against products with the default configuration
#[must_use]
pub fn match_requirements(requirements: &RequirementSet, products: &[Product]) -> Vec<MatchResult> {
    Matcher::new(products).match_requirements(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cable(sku: &str, voltage: &str, conductor: &str) -> Product {
        Product::new(sku, Some(1000.0))
            .with_attribute("VoltageRating", voltage)
            .with_attribute("ConductorMaterial", conductor)
    }

    fn requirements(value: serde_json::Value) -> RequirementSet {
        RequirementSet::from_value(&value).unwrap()
    }

    #[test]
    fn test_selects_best_product_per_requirement() {
        let products = vec![
            cable("SKU-CU", "1.1 kV", "Copper"),
            cable("SKU-AL", "1.1 kV", "Aluminium"),
        ];
        let reqs = requirements(json!([
            {"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"},
            {"VoltageRating": "1.1 kV", "ConductorMaterial": "Aluminium"}
        ]));

        let results = match_requirements(&reqs, &products);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item_label, "Item 1");
        assert_eq!(results[0].recommended_sku, Some(Sku::new("SKU-CU")));
        assert!((results[0].match_score - 100.0).abs() < f64::EPSILON);
        assert_eq!(results[1].item_label, "Item 2");
        assert_eq!(results[1].recommended_sku, Some(Sku::new("SKU-AL")));
        assert_eq!(results[1].quality(), MatchQuality::Full);
    }

    #[test]
    fn test_tie_resolves_to_first_product() {
        // Both products satisfy exactly one of the two fields
        let products = vec![
            cable("P1", "1.1 kV", "Aluminium"),
            cable("P2", "11 kV", "Copper"),
        ];
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"}]));

        let result = &match_requirements(&reqs, &products)[0];
        assert_eq!(result.recommended_sku, Some(Sku::new("P1")));
        assert!((result.match_score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_later_strictly_better_product_wins() {
        let products = vec![
            cable("P1", "11 kV", "Copper"),
            cable("P2", "1.1 kV", "Copper"),
        ];
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"}]));
        let result = &match_requirements(&reqs, &products)[0];
        assert_eq!(result.recommended_sku, Some(Sku::new("P2")));
    }

    #[test]
    fn test_empty_catalog() {
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV"}]));
        let results = match_requirements(&reqs, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].recommended_sku, None);
        assert!(results[0].match_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_field_requirement() {
        let products = vec![cable("P1", "1.1 kV", "Copper")];
        let reqs = requirements(json!([{}]));
        let results = match_requirements(&reqs, &products);
        assert_eq!(results[0].recommended_sku, None);
        assert!(results[0].match_score.abs() < f64::EPSILON);
        assert_eq!(results[0].total_fields, 0);
    }

    #[test]
    fn test_zero_score_is_no_match_by_default() {
        let products = vec![cable("P1", "11 kV", "Aluminium")];
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"}]));
        let result = &match_requirements(&reqs, &products)[0];
        assert_eq!(result.recommended_sku, None);
        assert_eq!(result.quality(), MatchQuality::None);
    }

    #[test]
    fn test_inclusive_zero_threshold_recommends_first_product() {
        let products = vec![
            cable("P1", "11 kV", "Aluminium"),
            cable("P2", "33 kV", "Aluminium"),
        ];
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV"}]));
        let config = MatchingConfig {
            threshold: ScoreThreshold::AtLeast(0.0),
        };
        let result = &Matcher::with_config(&products, config).match_requirements(&reqs)[0];
        assert_eq!(result.recommended_sku, Some(Sku::new("P1")));
        assert!(result.match_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_threshold_filters_weak_matches() {
        let products = vec![cable("P1", "1.1 kV", "Aluminium")];
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"}]));
        let config = MatchingConfig {
            threshold: ScoreThreshold::AtLeast(75.0),
        };
        let result = &Matcher::with_config(&products, config).match_requirements(&reqs)[0];
        assert_eq!(result.recommended_sku, None);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let products = vec![
            cable("A", "1.1 kV", "Copper"),
            cable("B", "1.1 kV", "Copper"),
            cable("C", "11 kV", "Aluminium"),
        ];
        let reqs = requirements(json!([
            {"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"},
            {"VoltageRating": "11 kV"},
            {"ConductorMaterial": "Aluminium", "ArmorType": "Steel Wire"}
        ]));
        let first = match_requirements(&reqs, &products);
        for _ in 0..20 {
            assert_eq!(match_requirements(&reqs, &products), first);
        }
    }

    #[test]
    fn test_rank_orders_by_score_then_catalog_order() {
        let products = vec![
            cable("A", "11 kV", "Copper"),
            cable("B", "1.1 kV", "Copper"),
            cable("C", "1.1 kV", "Aluminium"),
        ];
        let reqs = requirements(json!([{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"}]));
        let req = reqs.iter().next().unwrap();

        let ranked = Matcher::new(&products).rank(req, 5);
        let skus: Vec<&str> = ranked.iter().map(|c| c.sku.as_str()).collect();
        assert_eq!(skus, vec!["B", "A", "C"]);

        assert_eq!(Matcher::new(&products).rank(req, 1).len(), 1);
    }
}

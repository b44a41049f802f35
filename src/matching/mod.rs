//! Requirement-to-catalog matching.
//!
//! - [`Matcher`]: selects the best product for each requirement
//! - [`AttributeScore`]: attribute overlap between a requirement and a product
//! - [`ScoreThreshold`]: minimum score a product needs to be recommended
//!
//! ## Algorithm
//!
//! For each requirement, every product is scored as
//! `100 * matched_fields / requirement_fields`, where a field matches when the
//! product's value for that attribute, trimmed and lowercased, equals the
//! normalized required value. The product with the strictly highest score
//! wins; ties go to the product that appears first in the catalog.
//!
//! A requirement with no fields, or a catalog with no products, yields no
//! recommendation and a zero score.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bid_matcher::catalog::store::CatalogSnapshot;
//! use bid_matcher::core::requirement::RequirementSet;
//! use bid_matcher::matching::Matcher;
//!
//! let catalog = CatalogSnapshot::load_embedded().unwrap();
//! let requirements = RequirementSet::from_json(
//!     r#"[{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"}]"#,
//! ).unwrap();
//!
//! for m in Matcher::new(catalog.products()).match_requirements(&requirements) {
//!     println!("{}: {:?} ({:.1}%)", m.item_label, m.recommended_sku, m.match_score);
//! }
//! ```

pub mod engine;
pub mod scoring;

pub use engine::{MatchResult, Matcher, MatchingConfig, ScoreThreshold};
pub use scoring::AttributeScore;

//! # bid-matcher
//!
//! A library for turning the technical scope of a tender into a priced
//! response.
//!
//! A tender lists line items such as "1.1 kV copper XLPE steel-wire armoured
//! cable". `bid-matcher` recommends, for each item, the catalog product whose
//! attributes agree with the most requirement fields, then prices it as the
//! product's unit price plus the catalog's test and compliance costs.
//!
//! ## Features
//!
//! - **Attribute matching**: Case- and whitespace-insensitive field comparison
//! - **Deterministic tie-breaking**: Equal scores resolve to catalog order
//! - **All-or-nothing pricing**: An unreadable catalog rejects the whole batch
//! - **Tender selection**: Picks the first tender due within a look-ahead window
//! - **Scope extraction**: Rule-based, or model-backed with retry and fallback
//!
//! ## Example
//!
//! ```rust,no_run
//! use bid_matcher::catalog::store::{CatalogSnapshot, InMemoryCatalog};
//! use bid_matcher::pipeline::run_pricing;
//!
//! // Load the embedded sample catalog
//! let catalog = InMemoryCatalog::new(CatalogSnapshot::load_embedded().unwrap());
//!
//! let requirements = serde_json::json!([
//!     {"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper"},
//! ]);
//!
//! let report = run_pricing(&requirements, &catalog);
//! for item in &report.items {
//!     println!("{}: {:?} {:.2}", item.item_label, item.recommended_sku, item.total_cost);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Product catalog storage and indexing
//! - [`core`]: Core data types for products, requirements, and tenders
//! - [`matching`]: Matching engine and scoring
//! - [`pricing`]: Unit price lookup and test cost policies
//! - [`pipeline`]: Tender discovery, extraction, and orchestration
//! - [`parsing`]: Parsers for delimited catalog tables and model replies
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP API

pub mod catalog;
pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod pipeline;
pub mod pricing;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use crate::catalog::store::{CatalogSnapshot, CatalogStore};
pub use crate::core::product::{Product, TestItem};
pub use crate::core::requirement::{Requirement, RequirementSet};
pub use crate::core::tender::Tender;
pub use crate::core::types::*;
pub use crate::matching::engine::{MatchResult, Matcher};
pub use crate::pipeline::orchestrator::{
    run_pricing, run_pricing_json, PipelineReport, PipelineStatus,
};
pub use crate::pricing::calculator::{PricedItem, PricingCalculator};

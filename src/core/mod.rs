//! Core data types for tender matching and pricing.
//!
//! - [`Product`], [`TestItem`]: catalog entities
//! - [`Requirement`], [`RequirementSet`]: validated technical requirements
//! - [`Tender`], [`TenderCandidate`]: selected and raw tender listings
//! - [`Sku`], [`MatchQuality`]: identifiers and result classification
//!
//! ## Normalization
//!
//! Requirement values are trimmed and lowercased when a [`RequirementSet`]
//! is built. Product attributes keep their catalog casing and are normalized
//! at comparison time. Attribute *names* are compared exactly.
//!
//! [`Product`]: product::Product
//! [`TestItem`]: product::TestItem
//! [`Requirement`]: requirement::Requirement
//! [`RequirementSet`]: requirement::RequirementSet
//! [`Tender`]: tender::Tender
//! [`TenderCandidate`]: tender::TenderCandidate
//! [`Sku`]: types::Sku
//! [`MatchQuality`]: types::MatchQuality

pub mod product;
pub mod requirement;
pub mod tender;
pub mod types;

//! Proposal pricing.
//!
//! [`PricingCalculator`] joins match results with catalog unit prices and
//! adds test/compliance costs chosen by a [`TestCostPolicy`]. The shipped
//! policy, [`UniformAggregateTestCost`], charges every item the sum of all
//! tests.
//!
//! ## Rules
//!
//! - An empty batch, an unreadable catalog, or a product relation without a
//!   price column rejects the whole batch.
//! - An unknown SKU, an unmatched item, or a null price counts as `0`.
//! - `total_cost = unit_price + test_cost`.
//! - `NaN` and infinities are replaced with `0` in every output field.

pub mod calculator;
pub mod policy;

pub use calculator::{PricedItem, PricingCalculator, PricingError};
pub use policy::{TestCostPolicy, UniformAggregateTestCost};

//! End-to-end tender response pipeline.
//!
//! - [`discovery`]: candidate tenders and due-date window selection
//! - [`extraction`]: scope text to requirement records, with retry and fallback
//! - [`orchestrator`]: runs the stages in order and reports a terminal status
//!
//! A run moves through discovery, technical analysis, matching and pricing.
//! The first stage that produces nothing usable ends the run with
//! `no_tenders_found`, `technical_analysis_failed` or `pricing_failed`;
//! otherwise the run ends `completed` with one priced item per requirement.

pub mod discovery;
pub mod extraction;
pub mod orchestrator;

pub use discovery::{DiscoveryWindow, JsonTenderSource, StaticTenderSource, TenderSource};
pub use extraction::{RequirementExtractor, RetryPolicy, RetryingExtractor, RuleBasedExtractor};
pub use orchestrator::{run_pricing, run_pricing_json, Pipeline, PipelineReport, PipelineStatus};

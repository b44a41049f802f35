use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

use crate::catalog::store::CatalogStore;
use crate::core::requirement::{RequirementError, RequirementSet};
use crate::core::tender::Tender;
use crate::matching::engine::{Matcher, MatchingConfig};
use crate::pipeline::discovery::{DiscoveryWindow, TenderSource};
use crate::pipeline::extraction::RequirementExtractor;
use crate::pricing::calculator::{PricedItem, PricingCalculator, PricingError};

/// Terminal state of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Completed,
    NoTendersFound,
    TechnicalAnalysisFailed,
    PricingFailed,
}

impl PipelineStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoTendersFound => "no_tenders_found",
            Self::TechnicalAnalysisFailed => "technical_analysis_failed",
            Self::PricingFailed => "pricing_failed",
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a pipeline run.
///
/// A halted run carries no items; a completed run carries one priced item per
/// requirement, in requirement order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub status: PipelineStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tender: Option<Tender>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<PricedItem>,

    /// Test cost policy applied to `items`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_cost_policy: Option<&'static str>,

    /// Why the run halted, for logs and diagnostics
    #[serde(skip)]
    pub reason: Option<String>,
}

impl PipelineReport {
    #[must_use]
    pub fn halted(status: PipelineStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            tender: None,
            items: Vec::new(),
            test_cost_policy: None,
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn completed(items: Vec<PricedItem>, test_cost_policy: &'static str) -> Self {
        Self {
            status: PipelineStatus::Completed,
            tender: None,
            items,
            test_cost_policy: Some(test_cost_policy),
            reason: None,
        }
    }

    #[must_use]
    fn with_tender(mut self, tender: Tender) -> Self {
        self.tender = Some(tender);
        self
    }

    /// Sum of `total_cost` over all items
    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.items.iter().map(|i| i.total_cost).sum()
    }
}

/// Discovery -> extraction -> matching -> pricing.
///
/// Each stage runs only if the previous one produced a usable result; the
/// first failure ends the run with the matching status. The catalog is read
/// once per run so matching and pricing see the same snapshot.
pub struct Pipeline<'a> {
    tenders: &'a dyn TenderSource,
    extractor: &'a dyn RequirementExtractor,
    catalog: &'a dyn CatalogStore,
    window: DiscoveryWindow,
    matching: MatchingConfig,
    pricing: PricingCalculator,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        tenders: &'a dyn TenderSource,
        extractor: &'a dyn RequirementExtractor,
        catalog: &'a dyn CatalogStore,
        window: DiscoveryWindow,
    ) -> Self {
        Self {
            tenders,
            extractor,
            catalog,
            window,
            matching: MatchingConfig::default(),
            pricing: PricingCalculator::new(),
        }
    }

    #[must_use]
    pub fn with_matching_config(mut self, config: MatchingConfig) -> Self {
        self.matching = config;
        self
    }

    #[must_use]
    pub fn with_pricing(mut self, calculator: PricingCalculator) -> Self {
        self.pricing = calculator;
        self
    }

    /// Run every stage and report the terminal status
    #[must_use]
    pub fn run(&self) -> PipelineReport {
        info!("Stage: discovery");
        let candidates = match self.tenders.discover() {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Tender discovery failed: {e}");
                return PipelineReport::halted(PipelineStatus::NoTendersFound, e.to_string());
            }
        };
        let Some(tender) = self.window.select(&candidates) else {
            info!(
                "No tender due within {} days of {}",
                self.window.window_days, self.window.today
            );
            return PipelineReport::halted(
                PipelineStatus::NoTendersFound,
                format!("none of {} candidates due in window", candidates.len()),
            );
        };

        info!("Stage: technical analysis of '{}'", tender.title);
        let value = match self.extractor.extract(&tender) {
            Ok(value) => value,
            Err(e) => {
                warn!("Requirement extraction failed: {e}");
                return PipelineReport::halted(PipelineStatus::TechnicalAnalysisFailed, e.to_string())
                    .with_tender(tender);
            }
        };

        price_checked(
            RequirementSet::from_value(&value),
            self.catalog,
            self.matching,
            &self.pricing,
        )
        .with_tender(tender)
    }
}

/// Validate requirements, then match and price them against the catalog.
///
/// Malformed or empty requirements give `technical_analysis_failed`; an
/// unreadable catalog or a pricing failure gives `pricing_failed`.
#[must_use]
pub fn run_pricing(requirements: &Value, catalog: &dyn CatalogStore) -> PipelineReport {
    run_pricing_with(
        requirements,
        catalog,
        MatchingConfig::default(),
        &PricingCalculator::new(),
    )
}

/// [`run_pricing`] with explicit matching and pricing configuration
#[must_use]
pub fn run_pricing_with(
    requirements: &Value,
    catalog: &dyn CatalogStore,
    matching: MatchingConfig,
    pricing: &PricingCalculator,
) -> PipelineReport {
    price_checked(RequirementSet::from_value(requirements), catalog, matching, pricing)
}

/// [`run_pricing_with`] over raw requirement text.
///
/// Text that is not valid JSON halts with `technical_analysis_failed`, the
/// same as JSON of the wrong shape.
#[must_use]
pub fn run_pricing_json(
    requirements: &str,
    catalog: &dyn CatalogStore,
    matching: MatchingConfig,
    pricing: &PricingCalculator,
) -> PipelineReport {
    price_checked(RequirementSet::from_json(requirements), catalog, matching, pricing)
}

fn price_checked(
    requirements: Result<RequirementSet, RequirementError>,
    catalog: &dyn CatalogStore,
    matching: MatchingConfig,
    pricing: &PricingCalculator,
) -> PipelineReport {
    let requirements = match requirements {
        Ok(set) => set,
        Err(e) => {
            warn!("Rejected requirements: {e}");
            return PipelineReport::halted(PipelineStatus::TechnicalAnalysisFailed, e.to_string());
        }
    };
    info!("Validated {} requirements", requirements.len());

    match price_requirements(&requirements, catalog, matching, pricing) {
        Ok(items) => {
            info!("Pipeline completed with {} priced items", items.len());
            PipelineReport::completed(items, pricing.policy_name())
        }
        Err(e) => {
            warn!("Pricing failed: {e}");
            PipelineReport::halted(PipelineStatus::PricingFailed, e.to_string())
        }
    }
}

/// Match and price an already validated requirement set.
///
/// # Errors
///
/// Returns a `PricingError` if the catalog cannot be read or pricing rejects
/// the batch.
pub fn price_requirements(
    requirements: &RequirementSet,
    catalog: &dyn CatalogStore,
    matching: MatchingConfig,
    pricing: &PricingCalculator,
) -> Result<Vec<PricedItem>, PricingError> {
    info!("Stage: matching");
    let snapshot = catalog.snapshot()?;
    let matches = Matcher::with_config(snapshot.products(), matching).match_requirements(requirements);

    info!("Stage: pricing");
    pricing.price_snapshot(&matches, &snapshot)
}

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::tender::{Tender, TenderCandidate};

/// Default look-ahead for tender due dates
pub const DEFAULT_WINDOW_DAYS: u32 = 90;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to read tender listing: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse tender listing: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Tender source unavailable: {0}")]
    Unavailable(String),
}

/// Supplies candidate tenders, e.g. from a scraped listing
pub trait TenderSource: Send + Sync {
    /// Return every candidate currently listed
    ///
    /// # Errors
    ///
    /// Returns a `DiscoveryError` if the listing cannot be obtained.
    fn discover(&self) -> Result<Vec<TenderCandidate>, DiscoveryError>;
}

/// A fixed list of candidates
#[derive(Debug, Clone, Default)]
pub struct StaticTenderSource {
    candidates: Vec<TenderCandidate>,
}

impl StaticTenderSource {
    #[must_use]
    pub fn new(candidates: Vec<TenderCandidate>) -> Self {
        Self { candidates }
    }
}

impl TenderSource for StaticTenderSource {
    fn discover(&self) -> Result<Vec<TenderCandidate>, DiscoveryError> {
        Ok(self.candidates.clone())
    }
}

/// A JSON file holding an array of candidates
#[derive(Debug, Clone)]
pub struct JsonTenderSource {
    path: PathBuf,
}

impl JsonTenderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TenderSource for JsonTenderSource {
    fn discover(&self) -> Result<Vec<TenderCandidate>, DiscoveryError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Accepts tenders due after `today` and no later than `today + window_days`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryWindow {
    pub today: NaiveDate,
    pub window_days: u32,
}

impl DiscoveryWindow {
    #[must_use]
    pub fn new(today: NaiveDate, window_days: u32) -> Self {
        Self { today, window_days }
    }

    /// Window starting at the current UTC date
    #[must_use]
    pub fn from_today(window_days: u32) -> Self {
        Self::new(Utc::now().date_naive(), window_days)
    }

    /// Last accepted due date
    #[must_use]
    pub fn cutoff(&self) -> NaiveDate {
        self.today
            .checked_add_signed(Duration::days(i64::from(self.window_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    #[must_use]
    pub fn contains(&self, due_date: NaiveDate) -> bool {
        self.today < due_date && due_date <= self.cutoff()
    }

    /// First candidate, in listing order, that parses and falls in the window.
    ///
    /// Malformed candidates are skipped with a warning.
    #[must_use]
    pub fn select(&self, candidates: &[TenderCandidate]) -> Option<Tender> {
        for candidate in candidates {
            let tender = match candidate.parse() {
                Ok(tender) => tender,
                Err(reason) => {
                    warn!("Skipping tender '{}': {reason}", candidate.title);
                    continue;
                }
            };
            if self.contains(tender.due_date) {
                info!("Selected tender '{}' due {}", tender.title, tender.due_date);
                return Some(tender);
            }
        }
        None
    }
}

impl Default for DiscoveryWindow {
    fn default() -> Self {
        Self::from_today(DEFAULT_WINDOW_DAYS)
    }
}

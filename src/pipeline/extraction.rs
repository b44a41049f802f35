use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::tender::Tender;
use crate::parsing::delimited::ParseError;
use crate::parsing::reply::parse_json_reply;

/// Attribute keys every extracted requirement should carry
pub const REQUIRED_KEYS: [&str; 4] = [
    "VoltageRating",
    "ConductorMaterial",
    "InsulationType",
    "ArmorType",
];

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No requirements found in tender scope")]
    NothingExtracted,

    #[error("Completion request failed: {0}")]
    Completion(String),

    #[error("Unusable reply: {0}")]
    Reply(#[from] ParseError),

    #[error("Extraction failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<ExtractionError>,
    },
}

/// Turns a tender's scope text into untrusted requirement records.
///
/// Output is validated downstream with
/// [`RequirementSet::from_value`](crate::core::requirement::RequirementSet::from_value).
pub trait RequirementExtractor: Send + Sync {
    /// # Errors
    ///
    /// Returns an `ExtractionError` if no requirements can be produced.
    fn extract(&self, tender: &Tender) -> Result<Value, ExtractionError>;
}

/// Reads `Item N: ...` lines of a scope document.
///
/// Each item line is split on commas, semicolons and dashes; a segment that
/// starts with a known keyword becomes one attribute, e.g.
/// `Conductor Copper` becomes `"ConductorMaterial": "Copper"`.
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    keywords: Vec<(String, String)>,
}

impl RuleBasedExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_keywords([
            ("Voltage", "VoltageRating"),
            ("Conductor", "ConductorMaterial"),
            ("Insulation", "InsulationType"),
            ("Armour", "ArmorType"),
            ("Armor", "ArmorType"),
        ])
    }

    /// Extractor with a custom keyword -> attribute map
    pub fn with_keywords<K, A>(keywords: impl IntoIterator<Item = (K, A)>) -> Self
    where
        K: Into<String>,
        A: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|(k, a)| (k.into().to_lowercase(), a.into()))
                .collect(),
        }
    }

    /// Extract requirement records from scope text
    #[must_use]
    pub fn extract_text(&self, text: &str) -> Vec<Map<String, Value>> {
        text.lines()
            .filter_map(item_body)
            .map(|body| self.parse_item(body))
            .filter(|record| !record.is_empty())
            .collect()
    }

    fn parse_item(&self, body: &str) -> Map<String, Value> {
        let mut record = Map::new();
        for segment in body.split([',', ';', '\u{2014}', '\u{2013}']) {
            let segment = segment.trim().trim_end_matches('.').trim();
            if let Some((attribute, value)) = self.match_keyword(segment) {
                record
                    .entry(attribute.to_string())
                    .or_insert_with(|| Value::String(value.to_string()));
            }
        }
        record
    }

    fn match_keyword<'s>(&self, segment: &'s str) -> Option<(&str, &'s str)> {
        let lower = segment.to_lowercase();
        self.keywords.iter().find_map(|(keyword, attribute)| {
            let rest = lower.strip_prefix(keyword.as_str())?;
            if !rest.starts_with(|c: char| c.is_whitespace() || c == ':') {
                return None;
            }
            // Lowercasing can change byte lengths, so slice the original by
            // the keyword's char count.
            let offset = segment
                .char_indices()
                .nth(keyword.chars().count())
                .map_or(segment.len(), |(i, _)| i);
            let value = segment[offset..].trim_start_matches(':').trim();
            (!value.is_empty()).then_some((attribute.as_str(), value))
        })
    }
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementExtractor for RuleBasedExtractor {
    fn extract(&self, tender: &Tender) -> Result<Value, ExtractionError> {
        let records = self.extract_text(tender.scope_text());
        if records.is_empty() {
            return Err(ExtractionError::NothingExtracted);
        }
        debug!("Extracted {} requirement records", records.len());
        Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
    }
}

/// Body of an `Item N: ...` line
fn item_body(line: &str) -> Option<&str> {
    let line = line.trim();
    let head = line.get(..4)?;
    if !head.eq_ignore_ascii_case("item") {
        return None;
    }
    let (_, body) = line.split_once(':')?;
    Some(body)
}

/// A text-completion backend, e.g. a hosted language model
pub trait Completion: Send + Sync {
    /// # Errors
    ///
    /// Returns `ExtractionError::Completion` if the backend cannot answer.
    fn complete(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Asks a completion backend for requirements as a fenced JSON block
pub struct CompletionExtractor<C> {
    client: C,
}

impl<C: Completion> CompletionExtractor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: Completion> RequirementExtractor for CompletionExtractor<C> {
    fn extract(&self, tender: &Tender) -> Result<Value, ExtractionError> {
        let reply = self.client.complete(&build_prompt(tender.scope_text()))?;
        Ok(parse_json_reply(&reply)?)
    }
}

/// Prompt asking for one JSON object per item with [`REQUIRED_KEYS`]
#[must_use]
pub fn build_prompt(scope: &str) -> String {
    format!(
        "Extract the technical requirements for each item in the scope below.\n\
         Return a JSON array inside a ```json fenced block, one object per item, \
         with the keys {}.\n\nScope:\n{scope}\n",
        REQUIRED_KEYS.join(", ")
    )
}

/// Exponential backoff schedule: `base_delay * 2^attempt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after the given 0-based failed attempt
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Retries an extractor with backoff, optionally falling back to a fixed
/// requirement set once attempts are exhausted.
pub struct RetryingExtractor<E> {
    inner: E,
    policy: RetryPolicy,
    fallback: Option<Value>,
}

impl<E: RequirementExtractor> RetryingExtractor<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl<E: RequirementExtractor> RequirementExtractor for RetryingExtractor<E> {
    fn extract(&self, tender: &Tender) -> Result<Value, ExtractionError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last = ExtractionError::NothingExtracted;

        for attempt in 0..attempts {
            match self.inner.extract(tender) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Extraction attempt {}/{attempts} failed: {e}", attempt + 1);
                    last = e;
                }
            }
            if attempt + 1 < attempts {
                std::thread::sleep(self.policy.delay(attempt));
            }
        }

        match &self.fallback {
            Some(fallback) => {
                info!("Using fallback requirements after {attempts} failed attempts");
                Ok(fallback.clone())
            }
            None => Err(ExtractionError::Exhausted {
                attempts,
                last: Box::new(last),
            }),
        }
    }
}

/// Two armoured power cables: copper and aluminium, 1.1 kV XLPE steel wire
#[must_use]
pub fn default_requirements() -> Value {
    json!([
        {
            "VoltageRating": "1.1 kV",
            "ConductorMaterial": "Copper",
            "InsulationType": "XLPE",
            "ArmorType": "Steel Wire"
        },
        {
            "VoltageRating": "1.1 kV",
            "ConductorMaterial": "Aluminium",
            "InsulationType": "XLPE",
            "ArmorType": "Steel Wire"
        }
    ])
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by tender listings
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A tender (RFP) selected for response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    pub title: String,

    /// Submission deadline
    pub due_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Where the tender was found (portal name or URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Technical scope text, when the listing carried it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl Tender {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            due_date,
            organization: None,
            source: None,
            document: None,
        }
    }

    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Text handed to requirement extraction: the scope document if present,
    /// otherwise the title.
    #[must_use]
    pub fn scope_text(&self) -> &str {
        self.document.as_deref().unwrap_or(&self.title)
    }
}

/// A raw tender listing entry as produced by discovery.
///
/// Listings are untrusted: the due date is kept as text and only parsed when
/// the candidate is considered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderCandidate {
    #[serde(default)]
    pub title: String,

    #[serde(default, alias = "closing_date")]
    pub due_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl TenderCandidate {
    pub fn new(title: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            due_date: due_date.into(),
            organization: None,
            source: None,
            document: None,
        }
    }

    /// Parse into a [`Tender`].
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the title is blank or the due
    /// date is not `YYYY-MM-DD`.
    pub fn parse(&self) -> Result<Tender, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("missing title".to_string());
        }
        let due_date = NaiveDate::parse_from_str(self.due_date.trim(), DUE_DATE_FORMAT)
            .map_err(|e| format!("invalid due date '{}': {e}", self.due_date))?;

        Ok(Tender {
            title: title.to_string(),
            due_date,
            organization: self.organization.clone(),
            source: self.source.clone(),
            document: self.document.clone(),
        })
    }
}

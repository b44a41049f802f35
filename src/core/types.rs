use serde::{Deserialize, Serialize};

/// Stock-keeping unit, the primary key of a catalog product
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sku(pub String);

impl Sku {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable label for the requirement at a 1-based position
#[must_use]
pub fn item_label(index: usize) -> String {
    format!("Item {index}")
}

/// Coarse classification of a match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    /// No product was recommended
    None,
    Partial,
    /// Every requirement field matched
    Full,
}

impl MatchQuality {
    /// Classify a percentage score in `[0, 100]`
    #[must_use]
    pub fn from_score(score: f64, recommended: bool) -> Self {
        if !recommended {
            Self::None
        } else if score >= 100.0 {
            Self::Full
        } else {
            Self::Partial
        }
    }
}

impl std::fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NO MATCH"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Full => write!(f, "FULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_label() {
        assert_eq!(item_label(1), "Item 1");
        assert_eq!(item_label(12), "Item 12");
    }

    #[test]
    fn test_match_quality_from_score() {
        assert_eq!(MatchQuality::from_score(100.0, true), MatchQuality::Full);
        assert_eq!(MatchQuality::from_score(50.0, true), MatchQuality::Partial);
        assert_eq!(MatchQuality::from_score(0.0, true), MatchQuality::Partial);
        assert_eq!(MatchQuality::from_score(100.0, false), MatchQuality::None);
    }

    #[test]
    fn test_sku_serializes_as_plain_string() {
        let json = serde_json::to_string(&Sku::new("SKU-CU")).unwrap();
        assert_eq!(json, "\"SKU-CU\"");
    }
}

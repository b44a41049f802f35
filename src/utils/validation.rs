//! Centralized validation and helper functions.

/// Maximum number of requirement records accepted in a single set (DOS protection)
pub const MAX_REQUIREMENTS: usize = 10_000;

/// Maximum number of attribute fields in a single requirement record
pub const MAX_FIELDS_PER_REQUIREMENT: usize = 256;

/// Maximum number of rows in a single catalog relation
pub const MAX_CATALOG_ROWS: usize = 100_000;

/// Normalize an attribute value for comparison: trim surrounding whitespace
/// and fold to lowercase.
///
/// # Examples
///
/// ```
/// use bid_matcher::utils::validation::normalize_value;
///
/// assert_eq!(normalize_value("  Copper "), "copper");
/// assert_eq!(normalize_value("1.1 kV"), "1.1 kv");
/// ```
#[must_use]
pub fn normalize_value(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Replace `NaN` and infinities with `0.0`.
///
/// Every number leaving the pricing stage passes through here so that
/// downstream JSON consumers never see a non-finite value.
#[must_use]
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Safely convert usize to f64 for percentage calculations
#[inline]
#[must_use]
pub fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Check if adding another row would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new row.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_row_limit(count: usize) -> Option<String> {
    if count >= MAX_CATALOG_ROWS {
        Some(format!(
            "Too many rows: adding another would exceed maximum of {MAX_CATALOG_ROWS}"
        ))
    } else {
        None
    }
}

/// Parse a price or cost cell.
///
/// Empty cells and `null`/`NA` markers yield `Ok(None)`. Values such as
/// `NaN` or `inf` parse as non-finite floats and are kept as-is; the pricing
/// stage is responsible for sanitizing them.
///
/// # Errors
///
/// Returns the offending text if the cell is not a number.
pub fn parse_amount(cell: &str) -> Result<Option<f64>, String> {
    let cell = cell.trim();
    if cell.is_empty()
        || cell.eq_ignore_ascii_case("null")
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("none")
    {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| cell.to_string())
}

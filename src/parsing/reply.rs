//! Extraction of structured data from free-form model replies.

use serde_json::Value;

use crate::parsing::delimited::ParseError;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Return the body of the first ```` ```json ```` fenced block, trimmed.
///
/// # Examples
///
/// ```
/// use bid_matcher::parsing::reply::extract_json_block;
///
/// let reply = "Here you go:\n```json\n[{\"ArmorType\": \"Steel Wire\"}]\n```\nDone.";
/// assert_eq!(extract_json_block(reply), Some("[{\"ArmorType\": \"Steel Wire\"}]"));
/// assert_eq!(extract_json_block("no code here"), None);
/// ```
#[must_use]
pub fn extract_json_block(reply: &str) -> Option<&str> {
    let start = reply.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &reply[start..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

/// Parse the first fenced JSON block of a reply into an untrusted value.
///
/// The value is not validated here; callers pass it through
/// [`RequirementSet::from_value`](crate::core::requirement::RequirementSet::from_value).
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if there is no fenced block or its
/// body is not valid JSON.
pub fn parse_json_reply(reply: &str) -> Result<Value, ParseError> {
    let body = extract_json_block(reply)
        .ok_or_else(|| ParseError::InvalidFormat("No JSON block found in reply".to_string()))?;
    serde_json::from_str(body)
        .map_err(|e| ParseError::InvalidFormat(format!("Invalid JSON in reply: {e}")))
}

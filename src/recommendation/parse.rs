//! Turns raw model output into an `AiRecommendation`

use crate::models::AiRecommendation;
use crate::{OnTymError, Result};

/// Parse a model reply. Surrounding code-fence markup is removed first; if the
/// remainder is still not a JSON object, the outermost `{ ... }` span is tried.
pub fn parse_recommendation(raw: &str) -> Result<AiRecommendation> {
    let cleaned = strip_code_fences(raw);

    let first_error = match serde_json::from_str::<AiRecommendation>(cleaned) {
        Ok(recommendation) => return Ok(recommendation),
        Err(e) => e,
    };

    if let Some(object) = extract_json_object(cleaned) {
        if let Ok(recommendation) = serde_json::from_str::<AiRecommendation>(object) {
            return Ok(recommendation);
        }
    }

    Err(OnTymError::response_format(
        format!("model reply is not a recommendation object: {first_error}"),
        raw,
    ))
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` fence and a trailing
/// ```` ``` ````, whichever are present.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (e.g. "json") up to the end of the fence line
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

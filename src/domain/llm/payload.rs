use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::DomainError;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)\s*```").expect("valid regex"));

/// Parse the JSON payload out of a model reply.
///
/// Markdown code fences are stripped first. When the remaining text is not
/// JSON on its own, the outermost `{...}` or `[...]` span is tried before
/// giving up with [`DomainError::Parse`].
pub fn extract_structured_payload(text: &str) -> Result<Value, DomainError> {
    let unfenced = strip_code_fences(text);
    let trimmed = unfenced.trim();

    if trimmed.is_empty() {
        return Err(DomainError::parse("Empty model response"));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(span) = outer_span(trimmed, open, close) {
            if let Ok(value) = serde_json::from_str::<Value>(span) {
                return Ok(value);
            }
        }
    }

    Err(DomainError::parse(format!(
        "Model response is not valid JSON: {}",
        preview(trimmed)
    )))
}

fn strip_code_fences(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map_or(text, |body| body.as_str())
}

fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

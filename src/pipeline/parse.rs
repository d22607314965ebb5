use serde_json::Value;

use super::ValidationDecision;

const FENCE: &str = "```";

/// Unwraps model output that arrived as a fenced code block.
///
/// Text that does not start with a fence is only trimmed. Otherwise the body up
/// to the closing fence (or the end, if unclosed) is taken, and a leading `tag`
/// such as `sql` or `json` is dropped when it is followed by whitespace or,
/// for inline JSON, an opening brace.
pub fn strip_code_fence<'a>(text: &'a str, tag: &str) -> &'a str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let body = match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    };

    let body = match body.get(..tag.len()) {
        Some(head)
            if head.eq_ignore_ascii_case(tag)
                && body[tag.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| c.is_whitespace() || c == '{') =>
        {
            &body[tag.len()..]
        }
        _ => body,
    };

    body.trim()
}

/// Parses `{"allowed": bool, "reason": text}` from the validation model.
///
/// A missing or non-boolean `allowed` counts as denied; a missing `reason` is empty.
pub fn parse_decision(text: &str) -> Result<ValidationDecision, serde_json::Error> {
    let body = strip_code_fence(text, "json");
    let value: Value = serde_json::from_str(body)?;

    let allowed = value.get("allowed").and_then(Value::as_bool).unwrap_or(false);
    let reason = match value.get("reason") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(ValidationDecision { allowed, reason })
}

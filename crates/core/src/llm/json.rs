use crate::domain::advisory::Advisory;
use crate::domain::contract::LlmAdvisory;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Strip ```json ... ``` fences.
        let mut inner = trimmed;
        if let Some((_, after_first)) = inner.split_once('\n') {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Otherwise take the outermost braces, dropping any prose around them.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_advisory(text: &str, beginner_mode: bool) -> anyhow::Result<Advisory> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmAdvisory>(&json_str)
        .with_context(|| format!("LLM output is not valid advisory JSON: {json_str}"))?;
    parsed.validate_and_into_advisory(beginner_mode)
}

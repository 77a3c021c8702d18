//! Prompt construction and JSON extraction.
//!
//! Prompted mode embeds the schema in a system instruction and receives free
//! text back. [`extract_json`] recovers the JSON payload from that text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Opening text of the default prompted-mode instruction.
pub const DEFAULT_PREAMBLE: &str =
    "You are a helpful assistant that generates structured JSON output.";

const RULES: &str = "IMPORTANT INSTRUCTIONS:
1. You MUST respond with valid JSON that conforms to the schema below.
2. Do NOT include any text before or after the JSON.
3. Do NOT wrap the JSON in markdown code blocks.
4. Ensure all required fields are present and have valid values.
5. Follow all constraints specified in the schema (enum values, min/max, patterns, etc.).";

static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("valid fence regex")
});

/// Build the system instruction for prompted mode.
///
/// `preamble` replaces [`DEFAULT_PREAMBLE`] when given.
pub fn build_prompt(schema_json: &str, preamble: Option<&str>) -> String {
    format!(
        "{}\n\n{RULES}\n\nJSON Schema:\n```json\n{schema_json}\n```\n\nRespond with ONLY the JSON object.",
        preamble.unwrap_or(DEFAULT_PREAMBLE),
    )
}

/// Build the short system instruction sent alongside a native schema.
pub fn build_native_instruction(schema_json: &str) -> String {
    format!(
        "You must respond with valid JSON that conforms to the following JSON Schema:\n{schema_json}\n\nRespond only with the JSON object, no additional text."
    )
}

/// Pull the JSON payload out of a model response.
///
/// Tries, in order: the body of the first markdown fence, the span from the
/// first `{` to the last `}`, the span from the first `[` to the last `]`.
/// Falls back to the trimmed text, so the result is always something to
/// hand to the decoder.
///
/// # Example
///
/// ```rust
/// use schemaforge_output::extract_json;
///
/// let text = "Sure! Here it is:\n```json\n{\"ok\": true}\n```";
/// assert_eq!(extract_json(text), "{\"ok\": true}");
/// ```
pub fn extract_json(text: &str) -> String {
    let text = text.trim();

    if let Some(body) = FENCE.captures(text).and_then(|c| c.get(1)) {
        return body.as_str().trim().to_string();
    }

    if let Some(span) = span_between(text, '{', '}') {
        return span.to_string();
    }

    if let Some(span) = span_between(text, '[', ']') {
        return span.to_string();
    }

    text.to_string()
}

/// First `open` through last `close`, inclusive.
fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Whether the text is probably JSON.
pub fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::bare_object(r#"{"a": 1}"#, r#"{"a": 1}"#)]
    #[case::bare_array("[1, 2]", "[1, 2]")]
    #[case::json_fence("```json\n{\"a\": 1}\n```", r#"{"a": 1}"#)]
    #[case::plain_fence("```\n[true]\n```", "[true]")]
    #[case::fence_in_prose(
        "Here you go:\n```json\n{\"a\": {\"b\": 2}}\n```\nAnything else?",
        r#"{"a": {"b": 2}}"#
    )]
    #[case::object_in_prose(r#"The answer is {"x": "y"} as requested."#, r#"{"x": "y"}"#)]
    #[case::nested_object("Result: {\"a\": {\"b\": {}}} done", r#"{"a": {"b": {}}}"#)]
    #[case::array_in_prose("Values: [1, 2, 3].", "[1, 2, 3]")]
    #[case::no_json("  just words  ", "just words")]
    #[case::scalar("42", "42")]
    fn test_extract_json(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(extract_json(input), expected);
    }

    #[test]
    fn test_object_takes_precedence_over_array() {
        assert_eq!(extract_json(r#"[ignored] {"k": [1]}"#), r#"{"k": [1]}"#);
    }

    #[test]
    fn test_reversed_braces_fall_through() {
        assert_eq!(extract_json("} nothing {"), "} nothing {");
    }

    #[test]
    fn test_build_prompt_embeds_schema() {
        let prompt = build_prompt(r#"{"type":"object"}"#, None);
        assert!(prompt.starts_with(DEFAULT_PREAMBLE));
        assert!(prompt.contains("```json\n{\"type\":\"object\"}\n```"));
        assert!(prompt.contains("4. Ensure all required fields are present"));
        assert!(prompt.ends_with("Respond with ONLY the JSON object."));
    }

    #[test]
    fn test_build_prompt_custom_preamble() {
        let prompt = build_prompt("{}", Some("You classify support tickets."));
        assert!(prompt.starts_with("You classify support tickets.\n\nIMPORTANT INSTRUCTIONS:"));
        assert!(!prompt.contains(DEFAULT_PREAMBLE));
    }

    #[test]
    fn test_native_instruction() {
        let text = build_native_instruction(r#"{"type":"string"}"#);
        assert!(text.contains("following JSON Schema:\n{\"type\":\"string\"}"));
    }

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json(r#"  {"a": 1}  "#));
        assert!(looks_like_json("[1]"));
        assert!(!looks_like_json("hello"));
    }
}

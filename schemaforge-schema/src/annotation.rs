//! Per-field constraint options and the annotation mini-language.
//!
//! Constraints normally come from structured `#[schema(...)]` attributes, but
//! a single comma-separated annotation string is also accepted:
//!
//! ```text
//! required,enum=a,b,c,minimum=0,maxLength=20
//! ```
//!
//! The only ambiguity is a comma inside an `enum` list. A comma seen while
//! reading a value only separates tokens when the next segment looks like a
//! new token (a known flag or `key=value` with an alphanumeric key).

use indexmap::IndexMap;

/// Boolean flags known to the mini-language.
const KNOWN_FLAGS: &[&str] = &["required"];

/// Keys understood by the generator.
pub const KNOWN_KEYS: &[&str] = &[
    "required",
    "enum",
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "minItems",
    "maxItems",
    "description",
    "default",
];

/// One parsed constraint value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintValue {
    /// A bare flag such as `required`.
    Flag,
    /// A single `key=value` value.
    Value(String),
    /// A list of values (structured `enum_values(..)`).
    List(Vec<String>),
}

/// Ordered key/value constraints for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintOptions {
    entries: IndexMap<String, ConstraintValue>,
}

impl ConstraintOptions {
    /// Create an empty set of options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an annotation string. Never fails.
    #[must_use]
    pub fn parse(annotation: &str) -> Self {
        let mut options = Self::new();
        for token in tokenize(annotation) {
            match token.find('=') {
                Some(eq) if eq > 0 => {
                    let key = token[..eq].trim();
                    let value = token[eq + 1..].trim();
                    options.set(key, value);
                }
                _ => {
                    options.set_flag(token);
                }
            }
        }
        options
    }

    /// Merge `other` into `self`. Keys already present are overwritten.
    pub fn merge(&mut self, other: ConstraintOptions) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    /// Set a bare flag.
    pub fn set_flag(&mut self, key: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), ConstraintValue::Flag);
        self
    }

    /// Set a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries
            .insert(key.into(), ConstraintValue::Value(value.into()));
        self
    }

    /// Set a list value.
    pub fn set_list<I, S>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            key.into(),
            ConstraintValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    #[must_use]
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.set_flag(key);
        self
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    #[must_use]
    pub fn with_list<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_list(key, values);
        self
    }

    /// The raw value for a key. Flags yield `""`; lists are not returned.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            ConstraintValue::Flag => Some(""),
            ConstraintValue::Value(v) => Some(v.as_str()),
            ConstraintValue::List(_) => None,
        }
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&ConstraintValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether the field was marked `required`.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.contains("required")
    }

    /// The `enum` values, split on commas and trimmed when given as text.
    #[must_use]
    pub fn enum_values(&self) -> Option<Vec<String>> {
        match self.entries.get("enum")? {
            ConstraintValue::List(values) => Some(values.clone()),
            ConstraintValue::Value(raw) => Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            ConstraintValue::Flag => None,
        }
    }

    /// Keys with no meaning to the generator.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|k| !KNOWN_KEYS.contains(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConstraintValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split an annotation into trimmed, non-empty tokens.
fn tokenize(annotation: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_value = false;

    for (idx, ch) in annotation.char_indices() {
        match ch {
            '=' if !in_value => {
                in_value = true;
                current.push(ch);
            }
            ',' if in_value => {
                if starts_new_token(&annotation[idx + 1..]) {
                    push_token(&mut tokens, &current);
                    current.clear();
                    in_value = false;
                } else {
                    current.push(ch);
                }
            }
            ',' => {
                push_token(&mut tokens, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_token(&mut tokens, &current);
    tokens
}

fn push_token(tokens: &mut Vec<String>, raw: &str) {
    let token = raw.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
}

/// Whether the text after a comma begins a new token.
fn starts_new_token(rest: &str) -> bool {
    let segment = rest.split(',').next().unwrap_or("").trim();
    if KNOWN_FLAGS.contains(&segment) {
        return true;
    }
    match segment.split_once('=') {
        Some((key, _)) => !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_enum_then_flag() {
        let opts = ConstraintOptions::parse("enum=a,b,c,required");
        assert_eq!(opts.get("enum"), Some("a,b,c"));
        assert_eq!(opts.get("required"), Some(""));
        assert_eq!(opts.len(), 2);
        assert_eq!(
            opts.enum_values(),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_two_numeric_keys() {
        let opts = ConstraintOptions::parse("minimum=0,maximum=100");
        assert_eq!(opts.get("minimum"), Some("0"));
        assert_eq!(opts.get("maximum"), Some("100"));
        assert_eq!(opts.len(), 2);
    }

    #[test]
    fn test_flag_first_then_enum_then_key() {
        let opts = ConstraintOptions::parse("required,enum=red, green ,blue,maxLength=5");
        assert!(opts.is_required());
        assert_eq!(opts.get("enum"), Some("red, green ,blue"));
        assert_eq!(
            opts.enum_values().unwrap(),
            vec!["red", "green", "blue"]
        );
        assert_eq!(opts.get("maxLength"), Some("5"));
    }

    #[rstest]
    #[case("", 0)]
    #[case(",,,", 0)]
    #[case("  required  ", 1)]
    #[case("required,,minimum=1", 2)]
    #[case("description=hello, world", 1)]
    fn test_token_counts(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(ConstraintOptions::parse(input).len(), expected);
    }

    #[test]
    fn test_comma_in_description_is_kept() {
        let opts = ConstraintOptions::parse("description=hello, world");
        assert_eq!(opts.get("description"), Some("hello, world"));
    }

    #[test]
    fn test_pattern_keeps_equals_sign() {
        let opts = ConstraintOptions::parse("pattern=^a=b$,required");
        assert_eq!(opts.get("pattern"), Some("^a=b$"));
        assert!(opts.is_required());
    }

    #[test]
    fn test_leading_equals_is_a_flag() {
        let opts = ConstraintOptions::parse("=oops");
        assert_eq!(opts.get("=oops"), Some(""));
        assert_eq!(opts.unknown_keys().collect::<Vec<_>>(), vec!["=oops"]);
    }

    #[test]
    fn test_non_alphanumeric_key_does_not_split() {
        let opts = ConstraintOptions::parse("enum=a,x-y=1");
        assert_eq!(opts.get("enum"), Some("a,x-y=1"));
    }

    #[test]
    fn test_structured_list_and_merge() {
        let mut opts = ConstraintOptions::new()
            .with_flag("required")
            .with_list("enum", ["a", "b"]);
        assert_eq!(opts.enum_values().unwrap(), vec!["a", "b"]);
        assert_eq!(opts.get("enum"), None);

        opts.merge(ConstraintOptions::parse("minimum=3"));
        assert_eq!(opts.get("minimum"), Some("3"));
        assert!(opts.is_required());
    }

    #[test]
    fn test_order_is_preserved() {
        let opts = ConstraintOptions::parse("maximum=9,minimum=1,required");
        let keys: Vec<_> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["maximum", "minimum", "required"]);
    }
}

//! The JSON Schema document model.
//!
//! [`SchemaNode`] is a tree-owned representation of a JSON Schema node. Every
//! nested schema is itself a `SchemaNode`, and every node exclusively owns its
//! children, so a plain `Clone` is a full deep copy.
//!
//! Field names follow the JSON Schema vocabulary on the wire (`minLength`,
//! `additionalProperties`, `$defs`, ...), so documents produced here can be
//! consumed by any standard JSON Schema tool.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::errors::SchemaError;

/// The primitive JSON Schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number with no fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl SchemaKind {
    /// The JSON Schema keyword for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Integer => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Null => "null",
            SchemaKind::Object => "object",
            SchemaKind::Array => "array",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named string formats.
///
/// The well-known formats have dedicated variants; anything else is kept
/// verbatim in [`StringFormat::Custom`] so unknown formats survive a round
/// trip and can be served by a custom predicate in the
/// [`FormatRegistry`](crate::FormatRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StringFormat {
    /// RFC 3339 date-time.
    DateTime,
    /// Full date (`YYYY-MM-DD`).
    Date,
    /// Partial time with optional offset.
    Time,
    /// Email address.
    Email,
    /// Absolute URI.
    Uri,
    /// Hyphenated UUID.
    Uuid,
    /// DNS hostname.
    Hostname,
    /// Dotted-quad IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
    /// Any other format name.
    Custom(String),
}

impl StringFormat {
    /// The wire name of the format.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            StringFormat::DateTime => "date-time",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::Email => "email",
            StringFormat::Uri => "uri",
            StringFormat::Uuid => "uuid",
            StringFormat::Hostname => "hostname",
            StringFormat::Ipv4 => "ipv4",
            StringFormat::Ipv6 => "ipv6",
            StringFormat::Custom(name) => name,
        }
    }
}

impl From<&str> for StringFormat {
    fn from(name: &str) -> Self {
        match name {
            "date-time" => StringFormat::DateTime,
            "date" => StringFormat::Date,
            "time" => StringFormat::Time,
            "email" => StringFormat::Email,
            "uri" => StringFormat::Uri,
            "uuid" => StringFormat::Uuid,
            "hostname" => StringFormat::Hostname,
            "ipv4" => StringFormat::Ipv4,
            "ipv6" => StringFormat::Ipv6,
            other => StringFormat::Custom(other.to_string()),
        }
    }
}

impl From<String> for StringFormat {
    fn from(name: String) -> Self {
        StringFormat::from(name.as_str())
    }
}

impl From<StringFormat> for String {
    fn from(format: StringFormat) -> Self {
        format.as_str().to_string()
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for object properties not declared in `properties`.
///
/// Serialized as `false`, `true`, or a schema object.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// Undeclared properties are rejected.
    Disallowed,
    /// Undeclared properties are accepted without further checks.
    Any,
    /// Undeclared properties must match the schema.
    Typed(Box<SchemaNode>),
}

impl AdditionalProperties {
    /// The schema undeclared properties must satisfy, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&SchemaNode> {
        match self {
            AdditionalProperties::Typed(schema) => Some(schema),
            _ => None,
        }
    }

    /// Whether undeclared properties are accepted at all.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AdditionalProperties::Disallowed)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AdditionalPropertiesRepr {
    Flag(bool),
    Schema(Box<SchemaNode>),
}

impl Serialize for AdditionalProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AdditionalProperties::Disallowed => serializer.serialize_bool(false),
            AdditionalProperties::Any => serializer.serialize_bool(true),
            AdditionalProperties::Typed(schema) => schema.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AdditionalProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match AdditionalPropertiesRepr::deserialize(deserializer)? {
            AdditionalPropertiesRepr::Flag(true) => AdditionalProperties::Any,
            AdditionalPropertiesRepr::Flag(false) => AdditionalProperties::Disallowed,
            AdditionalPropertiesRepr::Schema(schema) => AdditionalProperties::Typed(schema),
        })
    }
}

/// Keeps an explicit JSON `null` as `Some(Value::Null)` instead of `None`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

/// A JSON Schema node.
///
/// # Example
///
/// ```rust
/// use schemaforge_schema::SchemaNode;
///
/// let schema = SchemaNode::object()
///     .with_title("Person")
///     .with_property("name", SchemaNode::string().with_min_length(1))
///     .with_property("age", SchemaNode::integer().with_minimum(0.0))
///     .with_required(["name"]);
///
/// assert!(schema.is_required("name"));
/// assert!(schema.has_property("age"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Dialect URI.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Schema identifier.
    #[serde(rename = "$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Reference to another schema.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The expected kind; `None` accepts any kind.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaKind>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<usize>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pattern_properties: IndexMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_contains: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_contains: Option<usize>,

    /// Allowed literal values, in declaration order.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<JsonValue>,
    /// The single allowed literal value. `Some(Value::Null)` means "must be null".
    #[serde(
        rename = "const",
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub const_value: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<JsonValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaNode>>,

    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<SchemaNode>>,
    #[serde(rename = "then", default, skip_serializing_if = "Option::is_none")]
    pub then_schema: Option<Box<SchemaNode>>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<SchemaNode>>,

    /// Reusable definitions, addressed as `#/$defs/<name>`.
    #[serde(rename = "$defs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub defs: IndexMap<String, SchemaNode>,
}

impl SchemaNode {
    /// Create a schema of the given kind.
    #[must_use]
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// A schema that accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    #[must_use]
    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::new(SchemaKind::Integer)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(SchemaKind::Null)
    }

    /// An object schema with no declared properties.
    #[must_use]
    pub fn object() -> Self {
        Self::new(SchemaKind::Object)
    }

    /// A homogeneous array schema.
    #[must_use]
    pub fn array(items: SchemaNode) -> Self {
        Self {
            kind: Some(SchemaKind::Array),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// A kind-less schema restricted to the given values.
    #[must_use]
    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::default().with_enum(values)
    }

    /// A schema that only holds a `$ref`.
    #[must_use]
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<JsonValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_examples<I, V>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Add (or replace) a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.add_property(name, schema);
        self
    }

    /// Mark names as required.
    #[must_use]
    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_required(name);
        }
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<StringFormat>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    #[must_use]
    pub fn with_maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    #[must_use]
    pub fn with_exclusive_minimum(mut self, min: f64) -> Self {
        self.exclusive_minimum = Some(min);
        self
    }

    #[must_use]
    pub fn with_exclusive_maximum(mut self, max: f64) -> Self {
        self.exclusive_maximum = Some(max);
        self
    }

    #[must_use]
    pub fn with_multiple_of(mut self, factor: f64) -> Self {
        self.multiple_of = Some(factor);
        self
    }

    #[must_use]
    pub fn with_min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    #[must_use]
    pub fn with_unique_items(mut self, unique: bool) -> Self {
        self.unique_items = Some(unique);
        self
    }

    #[must_use]
    pub fn with_prefix_items(mut self, items: Vec<SchemaNode>) -> Self {
        self.prefix_items = items;
        self
    }

    /// Require matching elements; `min`/`max` bound how many may match.
    #[must_use]
    pub fn with_contains(mut self, schema: SchemaNode, min: Option<usize>, max: Option<usize>) -> Self {
        self.contains = Some(Box::new(schema));
        self.min_contains = min;
        self.max_contains = max;
        self
    }

    #[must_use]
    pub fn with_min_properties(mut self, min: usize) -> Self {
        self.min_properties = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_properties(mut self, max: usize) -> Self {
        self.max_properties = Some(max);
        self
    }

    #[must_use]
    pub fn with_additional_properties(mut self, policy: AdditionalProperties) -> Self {
        self.additional_properties = Some(policy);
        self
    }

    #[must_use]
    pub fn with_pattern_property(mut self, pattern: impl Into<String>, schema: SchemaNode) -> Self {
        self.pattern_properties.insert(pattern.into(), schema);
        self
    }

    #[must_use]
    pub fn with_property_names(mut self, schema: SchemaNode) -> Self {
        self.property_names = Some(Box::new(schema));
        self
    }

    #[must_use]
    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_const(mut self, value: impl Into<JsonValue>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_all_of(mut self, schemas: Vec<SchemaNode>) -> Self {
        self.all_of = schemas;
        self
    }

    #[must_use]
    pub fn with_any_of(mut self, schemas: Vec<SchemaNode>) -> Self {
        self.any_of = schemas;
        self
    }

    #[must_use]
    pub fn with_one_of(mut self, schemas: Vec<SchemaNode>) -> Self {
        self.one_of = schemas;
        self
    }

    #[must_use]
    pub fn with_not(mut self, schema: SchemaNode) -> Self {
        self.not = Some(Box::new(schema));
        self
    }

    /// Attach an `if`/`then`/`else` triple.
    #[must_use]
    pub fn with_condition(
        mut self,
        if_schema: SchemaNode,
        then_schema: Option<SchemaNode>,
        else_schema: Option<SchemaNode>,
    ) -> Self {
        self.if_schema = Some(Box::new(if_schema));
        self.then_schema = then_schema.map(Box::new);
        self.else_schema = else_schema.map(Box::new);
        self
    }

    #[must_use]
    pub fn with_definition(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.defs.insert(name.into(), schema);
        self
    }

    /// Add (or replace) a property without consuming the node.
    pub fn add_property(&mut self, name: impl Into<String>, schema: SchemaNode) -> &mut Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark a name as required. Names already present are not duplicated.
    pub fn add_required(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// An independent copy of the whole tree.
    ///
    /// Nodes own their children, so this is a full structural clone: mutating
    /// the copy never affects the original (useful for tweaking a cached
    /// schema).
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Look up an entry in `$defs`.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&SchemaNode> {
        self.defs.get(name)
    }

    /// Serialize to compact JSON text.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON text.
    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Convert into a generic JSON value.
    pub fn to_value(&self) -> Result<JsonValue, SchemaError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a schema from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build a schema from a generic JSON value.
    pub fn from_value(value: JsonValue) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }
}

impl TryFrom<JsonValue> for SchemaNode {
    type Error = SchemaError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person() -> SchemaNode {
        SchemaNode::object()
            .with_property("name", SchemaNode::string().with_min_length(1))
            .with_property("age", SchemaNode::integer().with_minimum(0.0))
            .with_property("tags", SchemaNode::array(SchemaNode::string()))
            .with_required(["name", "age"])
    }

    #[test]
    fn test_constructors() {
        assert_eq!(SchemaNode::string().kind, Some(SchemaKind::String));
        assert_eq!(SchemaNode::number().kind, Some(SchemaKind::Number));
        assert_eq!(SchemaNode::integer().kind, Some(SchemaKind::Integer));
        assert_eq!(SchemaNode::boolean().kind, Some(SchemaKind::Boolean));
        assert_eq!(SchemaNode::null().kind, Some(SchemaKind::Null));
        assert_eq!(SchemaNode::any().kind, None);

        let arr = SchemaNode::array(SchemaNode::integer());
        assert_eq!(arr.kind, Some(SchemaKind::Array));
        assert_eq!(arr.items.unwrap().kind, Some(SchemaKind::Integer));
    }

    #[test]
    fn test_required_is_deduplicated() {
        let mut schema = SchemaNode::object();
        schema.add_required("a").add_required("b").add_required("a");
        assert_eq!(schema.required, vec!["a", "b"]);
    }

    #[test]
    fn test_property_lookup() {
        let schema = person();
        assert!(schema.is_required("name"));
        assert!(!schema.is_required("tags"));
        assert!(schema.has_property("tags"));
        assert!(!schema.has_property("missing"));
        assert!(schema.get_property("missing").is_none());
        assert_eq!(
            schema.get_property("age").and_then(|p| p.minimum),
            Some(0.0)
        );
    }

    #[test]
    fn test_serializes_with_json_schema_vocabulary() {
        let schema = SchemaNode::object()
            .with_property(
                "code",
                SchemaNode::string()
                    .with_min_length(2)
                    .with_max_length(8)
                    .with_format(StringFormat::Uuid),
            )
            .with_additional_properties(AdditionalProperties::Disallowed)
            .with_definition("Leaf", SchemaNode::null());

        let value = schema.to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string", "minLength": 2, "maxLength": 8, "format": "uuid"}
                },
                "additionalProperties": false,
                "$defs": {"Leaf": {"type": "null"}}
            })
        );
    }

    #[test]
    fn test_additional_properties_tri_state() {
        let any = SchemaNode::object().with_additional_properties(AdditionalProperties::Any);
        assert_eq!(any.to_value().unwrap()["additionalProperties"], json!(true));

        let typed = SchemaNode::object().with_additional_properties(AdditionalProperties::Typed(
            Box::new(SchemaNode::integer()),
        ));
        assert_eq!(
            typed.to_value().unwrap()["additionalProperties"],
            json!({"type": "integer"})
        );

        let parsed = SchemaNode::from_value(json!({"additionalProperties": false})).unwrap();
        assert_eq!(
            parsed.additional_properties,
            Some(AdditionalProperties::Disallowed)
        );
        let parsed = SchemaNode::from_value(json!({"additionalProperties": {"type": "string"}}))
            .unwrap();
        assert_eq!(
            parsed.additional_properties.as_ref().and_then(|ap| ap.schema()).and_then(|s| s.kind),
            Some(SchemaKind::String)
        );
    }

    #[test]
    fn test_const_null_is_preserved() {
        let parsed = SchemaNode::from_value(json!({"const": null})).unwrap();
        assert_eq!(parsed.const_value, Some(JsonValue::Null));

        let parsed = SchemaNode::from_value(json!({"type": "string"})).unwrap();
        assert_eq!(parsed.const_value, None);
    }

    #[test]
    fn test_custom_format_round_trip() {
        let schema = SchemaNode::string().with_format("phone");
        let text = schema.to_json().unwrap();
        assert!(text.contains("\"format\":\"phone\""));
        let back = SchemaNode::from_json(&text).unwrap();
        assert_eq!(back.format, Some(StringFormat::Custom("phone".into())));
    }

    #[test]
    fn test_complex_round_trip() {
        let schema = person()
            .with_title("Person")
            .with_description("someone")
            .with_pattern_property("^x-", SchemaNode::string())
            .with_property_names(SchemaNode::string().with_max_length(20))
            .with_any_of(vec![SchemaNode::object(), SchemaNode::null()])
            .with_not(SchemaNode::boolean())
            .with_condition(
                SchemaNode::object().with_required(["age"]),
                Some(SchemaNode::object().with_min_properties(2)),
                None,
            )
            .with_examples([json!({"name": "a", "age": 1})]);

        let text = schema.to_json_pretty().unwrap();
        let back = SchemaNode::from_json(&text).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let original = person().with_additional_properties(AdditionalProperties::Typed(Box::new(
            SchemaNode::string(),
        )));
        let mut copy = original.deep_copy();

        copy.properties.get_mut("name").unwrap().min_length = Some(10);
        if let Some(AdditionalProperties::Typed(schema)) = copy.additional_properties.as_mut() {
            schema.max_length = Some(3);
        }
        copy.add_required("tags");

        assert_eq!(original.get_property("name").unwrap().min_length, Some(1));
        assert_eq!(
            original
                .additional_properties
                .as_ref()
                .and_then(|ap| ap.schema())
                .and_then(|s| s.max_length),
            None
        );
        assert!(!original.is_required("tags"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SchemaNode::from_json("not json").is_err());
        assert!(SchemaNode::from_json(r#"{"type": "widget"}"#).is_err());
    }
}

//! Validation of JSON values against schema documents.
//!
//! The validator never fails: every problem is recorded as a
//! [`ValidationError`](crate::ValidationError) with the path of the offending
//! value, and the whole list is returned. An empty list means the value
//! conforms.
//!
//! Paths use dots for properties and brackets for indices, with no leading
//! dot at the root: `user.tags[2]`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use tracing::{trace, warn};

use crate::errors::ValidationErrors;
use crate::formats::FormatRegistry;
use crate::schema::{AdditionalProperties, SchemaKind, SchemaNode};

/// Consecutive `$ref` hops on one value before giving up on a reference cycle.
const MAX_REF_DEPTH: usize = 64;

/// Relative tolerance for `multipleOf` quotients.
const MULTIPLE_OF_EPSILON: f64 = 1e-9;

/// Validates JSON values against [`SchemaNode`]s.
///
/// Cheap to share: format predicates live behind an `Arc` and compiled
/// patterns are cached behind a read-write lock.
///
/// # Example
///
/// ```rust
/// use schemaforge_schema::{SchemaNode, SchemaValidator};
/// use serde_json::json;
///
/// let schema = SchemaNode::object()
///     .with_property("tags", SchemaNode::array(SchemaNode::string()))
///     .with_required(["tags"]);
///
/// let errors = SchemaValidator::new().validate(&json!({"tags": ["a", 1]}), &schema);
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors.iter().next().unwrap().path, "tags[1]");
/// ```
#[derive(Debug)]
pub struct SchemaValidator {
    formats: Arc<FormatRegistry>,
    patterns: RwLock<HashMap<String, Result<Regex, String>>>,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator {
    /// A validator using the built-in formats.
    #[must_use]
    pub fn new() -> Self {
        Self::with_formats(FormatRegistry::shared())
    }

    /// A validator using a custom format registry.
    #[must_use]
    pub fn with_formats(formats: Arc<FormatRegistry>) -> Self {
        Self {
            formats,
            patterns: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn formats(&self) -> &Arc<FormatRegistry> {
        &self.formats
    }

    /// Validate a value, returning every violation.
    #[must_use]
    pub fn validate(&self, value: &JsonValue, schema: &SchemaNode) -> ValidationErrors {
        let mut pass = Pass {
            validator: self,
            root: schema,
            ref_depth: 0,
        };
        let mut errors = ValidationErrors::new();
        pass.node(value, schema, "", &mut errors);
        errors
    }

    /// Validate against an optional schema. No schema means no constraints.
    #[must_use]
    pub fn validate_optional(
        &self,
        value: &JsonValue,
        schema: Option<&SchemaNode>,
    ) -> ValidationErrors {
        match schema {
            Some(schema) => self.validate(value, schema),
            None => ValidationErrors::new(),
        }
    }

    /// Decode JSON text and validate it.
    ///
    /// Text that does not decode yields a single violation at the root.
    #[must_use]
    pub fn validate_str(&self, text: &str, schema: &SchemaNode) -> ValidationErrors {
        match serde_json::from_str::<JsonValue>(text) {
            Ok(value) => self.validate(&value, schema),
            Err(e) => {
                let mut errors = ValidationErrors::new();
                errors.add("", format!("invalid JSON: {e}"));
                errors
            }
        }
    }

    #[must_use]
    pub fn is_valid(&self, value: &JsonValue, schema: &SchemaNode) -> bool {
        self.validate(value, schema).is_empty()
    }

    /// Compile a pattern, caching the outcome.
    fn regex(&self, pattern: &str) -> Result<Regex, String> {
        if let Some(cached) = self.patterns.read().get(pattern) {
            return cached.clone();
        }
        let compiled = Regex::new(pattern).map_err(|e| e.to_string());
        self.patterns
            .write()
            .entry(pattern.to_string())
            .or_insert(compiled)
            .clone()
    }
}

/// Validate with a default validator.
#[must_use]
pub fn validate(value: &JsonValue, schema: &SchemaNode) -> ValidationErrors {
    SchemaValidator::new().validate(value, schema)
}

/// One validation run against a fixed root schema.
struct Pass<'a> {
    validator: &'a SchemaValidator,
    root: &'a SchemaNode,
    ref_depth: usize,
}

impl<'a> Pass<'a> {
    fn node(
        &mut self,
        value: &JsonValue,
        schema: &'a SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        if let Some(reference) = &schema.reference {
            self.reference(value, reference, path, errors);
        }

        if let Some(expected) = &schema.const_value {
            if !values_equal(value, expected) {
                errors.add(path, format!("value must be {expected}"));
            }
            return;
        }

        if !schema.enum_values.is_empty()
            && !schema.enum_values.iter().any(|v| values_equal(value, v))
        {
            let allowed: Vec<String> = schema.enum_values.iter().map(|v| v.to_string()).collect();
            errors.add(
                path,
                format!("value must be one of: {}", allowed.join(", ")),
            );
        }

        match schema.kind {
            Some(SchemaKind::String) => self.string(value, schema, path, errors),
            Some(SchemaKind::Number) => self.number(value, schema, path, errors),
            Some(SchemaKind::Integer) => self.integer(value, schema, path, errors),
            Some(SchemaKind::Boolean) => {
                if !value.is_boolean() {
                    errors.add(path, format!("expected boolean, got {}", type_name(value)));
                }
            }
            Some(SchemaKind::Null) => {
                if !value.is_null() {
                    errors.add(path, format!("expected null, got {}", type_name(value)));
                }
            }
            Some(SchemaKind::Object) => self.object(value, schema, path, errors),
            Some(SchemaKind::Array) => self.array(value, schema, path, errors),
            None => {}
        }

        self.composition(value, schema, path, errors);
    }

    /// Validate a value nested inside the current one.
    ///
    /// Descending consumes part of the value, so the `$ref` hop count restarts.
    fn child(
        &mut self,
        value: &JsonValue,
        schema: &'a SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        let hops = std::mem::replace(&mut self.ref_depth, 0);
        self.node(value, schema, path, errors);
        self.ref_depth = hops;
    }

    /// Run a sub-validation into a fresh list.
    fn check(&mut self, value: &JsonValue, schema: &'a SchemaNode, path: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        self.node(value, schema, path, &mut errors);
        errors
    }

    fn matches(&mut self, value: &JsonValue, schema: &'a SchemaNode) -> bool {
        self.check(value, schema, "").is_empty()
    }

    fn reference(
        &mut self,
        value: &JsonValue,
        reference: &str,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        if !reference.starts_with('#') {
            errors.add(path, format!("remote reference not supported: {reference}"));
            return;
        }
        let Some(target) = resolve_local(self.root, reference) else {
            errors.add(path, format!("unresolved reference: {reference}"));
            return;
        };
        if self.ref_depth >= MAX_REF_DEPTH {
            errors.add(path, format!("reference depth exceeded at {reference}"));
            return;
        }
        self.ref_depth += 1;
        self.node(value, target, path, errors);
        self.ref_depth -= 1;
    }

    fn string(
        &mut self,
        value: &JsonValue,
        schema: &SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        let Some(text) = value.as_str() else {
            errors.add(path, format!("expected string, got {}", type_name(value)));
            return;
        };

        let length = text.chars().count();
        if let Some(min) = schema.min_length {
            if length < min {
                errors.add(path, format!("string length {length} is less than minimum {min}"));
            }
        }
        if let Some(max) = schema.max_length {
            if length > max {
                errors.add(path, format!("string length {length} exceeds maximum {max}"));
            }
        }

        if let Some(pattern) = &schema.pattern {
            match self.validator.regex(pattern) {
                Ok(re) if !re.is_match(text) => {
                    errors.add(path, format!("string does not match pattern {pattern:?}"));
                }
                Ok(_) => {}
                Err(reason) => {
                    errors.add(path, format!("invalid pattern {pattern:?}: {reason}"));
                }
            }
        }

        if let Some(format) = &schema.format {
            match self.validator.formats.check(format.as_str(), text) {
                Some(false) => {
                    errors.add(path, format!("string does not match format {:?}", format.as_str()));
                }
                Some(true) => {}
                None => trace!(format = %format, "Skipping unknown string format"),
            }
        }
    }

    fn number(
        &mut self,
        value: &JsonValue,
        schema: &SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        match value.as_f64() {
            Some(num) => numeric_bounds(num, schema, path, errors),
            None => errors.add(path, format!("expected number, got {}", type_name(value))),
        }
    }

    fn integer(
        &mut self,
        value: &JsonValue,
        schema: &SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        let Some(num) = value.as_f64() else {
            errors.add(path, format!("expected integer, got {}", type_name(value)));
            return;
        };
        if !is_integral(value) {
            errors.add(path, format!("expected integer, got {num}"));
            return;
        }
        numeric_bounds(num, schema, path, errors);
    }

    fn object(
        &mut self,
        value: &JsonValue,
        schema: &'a SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        let Some(obj) = value.as_object() else {
            errors.add(path, format!("expected object, got {}", type_name(value)));
            return;
        };

        for name in &schema.required {
            match obj.get(name) {
                None => errors.add(join_path(path, name), "required field is missing"),
                Some(JsonValue::Null) => {
                    errors.add(join_path(path, name), "required field must not be null")
                }
                Some(_) => {}
            }
        }

        if let Some(min) = schema.min_properties {
            if obj.len() < min {
                errors.add(path, format!("object has {} properties, minimum is {min}", obj.len()));
            }
        }
        if let Some(max) = schema.max_properties {
            if obj.len() > max {
                errors.add(path, format!("object has {} properties, maximum is {max}", obj.len()));
            }
        }

        // Declared properties in schema order, then undeclared keys.
        let declared = schema
            .properties
            .keys()
            .filter_map(|name| obj.get_key_value(name));
        let undeclared = obj
            .iter()
            .filter(|(name, _)| !schema.properties.contains_key(*name));

        for (name, item) in declared.chain(undeclared) {
            let item_path = join_path(path, name);

            if let Some(property) = schema.properties.get(name) {
                self.child(item, property, &item_path, errors);
            } else {
                match &schema.additional_properties {
                    Some(AdditionalProperties::Disallowed) => {
                        errors.add(item_path.clone(), "additional property not allowed");
                    }
                    Some(AdditionalProperties::Typed(extra)) => {
                        self.child(item, extra, &item_path, errors);
                    }
                    Some(AdditionalProperties::Any) | None => {}
                }
            }

            for (pattern, pattern_schema) in &schema.pattern_properties {
                match self.validator.regex(pattern) {
                    Ok(re) if re.is_match(name) => {
                        self.child(item, pattern_schema, &item_path, errors);
                    }
                    Ok(_) => {}
                    Err(reason) => {
                        warn!(pattern = %pattern, reason = %reason, "Skipping invalid patternProperties regex");
                    }
                }
            }
        }

        if let Some(names) = &schema.property_names {
            for name in obj.keys() {
                let key = JsonValue::String(name.clone());
                self.child(&key, names, &join_path(path, name), errors);
            }
        }
    }

    fn array(
        &mut self,
        value: &JsonValue,
        schema: &'a SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        let Some(items) = value.as_array() else {
            errors.add(path, format!("expected array, got {}", type_name(value)));
            return;
        };

        if let Some(min) = schema.min_items {
            if items.len() < min {
                errors.add(path, format!("array has {} items, minimum is {min}", items.len()));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                errors.add(path, format!("array has {} items, maximum is {max}", items.len()));
            }
        }

        if schema.unique_items == Some(true) {
            let mut seen = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                if !seen.insert(canonical(item)) {
                    errors.add(
                        index_path(path, i),
                        "duplicate item in array with uniqueItems constraint",
                    );
                }
            }
        }

        for (i, (item, prefix)) in items.iter().zip(&schema.prefix_items).enumerate() {
            self.child(item, prefix, &index_path(path, i), errors);
        }

        if let Some(item_schema) = &schema.items {
            for (i, item) in items.iter().enumerate().skip(schema.prefix_items.len()) {
                self.child(item, item_schema, &index_path(path, i), errors);
            }
        }

        if let Some(contains) = &schema.contains {
            let found = items
                .iter()
                .filter(|item| {
                    let mut scratch = ValidationErrors::new();
                    self.child(item, contains, "", &mut scratch);
                    scratch.is_empty()
                })
                .count();
            let min = schema.min_contains.unwrap_or(1);
            if found < min {
                errors.add(
                    path,
                    format!("array must contain at least {min} matching items, found {found}"),
                );
            }
            if let Some(max) = schema.max_contains {
                if found > max {
                    errors.add(
                        path,
                        format!("array must contain at most {max} matching items, found {found}"),
                    );
                }
            }
        }
    }

    fn composition(
        &mut self,
        value: &JsonValue,
        schema: &'a SchemaNode,
        path: &str,
        errors: &mut ValidationErrors,
    ) {
        for branch in &schema.all_of {
            self.node(value, branch, path, errors);
        }

        if !schema.any_of.is_empty() && !schema.any_of.iter().any(|b| self.matches(value, b)) {
            errors.add(path, "value does not match any schema in anyOf");
        }

        if !schema.one_of.is_empty() {
            let matched = schema
                .one_of
                .iter()
                .filter(|b| self.matches(value, b))
                .count();
            if matched == 0 {
                errors.add(path, "value does not match any schema in oneOf");
            } else if matched > 1 {
                errors.add(
                    path,
                    format!("value matches {matched} schemas in oneOf, expected exactly one"),
                );
            }
        }

        if let Some(not) = &schema.not {
            if self.matches(value, not) {
                errors.add(path, "value must not match schema in not");
            }
        }

        if let Some(condition) = &schema.if_schema {
            let branch = if self.matches(value, condition) {
                schema.then_schema.as_deref()
            } else {
                schema.else_schema.as_deref()
            };
            if let Some(branch) = branch {
                self.node(value, branch, path, errors);
            }
        }
    }
}

fn numeric_bounds(num: f64, schema: &SchemaNode, path: &str, errors: &mut ValidationErrors) {
    if let Some(min) = schema.minimum {
        if num < min {
            errors.add(path, format!("value {num} is less than minimum {min}"));
        }
    }
    if let Some(max) = schema.maximum {
        if num > max {
            errors.add(path, format!("value {num} exceeds maximum {max}"));
        }
    }
    if let Some(min) = schema.exclusive_minimum {
        if num <= min {
            errors.add(path, format!("value {num} must be greater than {min}"));
        }
    }
    if let Some(max) = schema.exclusive_maximum {
        if num >= max {
            errors.add(path, format!("value {num} must be less than {max}"));
        }
    }
    if let Some(factor) = schema.multiple_of {
        if factor != 0.0 {
            let quotient = num / factor;
            let tolerance = MULTIPLE_OF_EPSILON * quotient.abs().max(1.0);
            if (quotient - quotient.round()).abs() > tolerance {
                errors.add(path, format!("value {num} is not a multiple of {factor}"));
            }
        }
    }
}

fn is_integral(value: &JsonValue) -> bool {
    match value {
        JsonValue::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Resolve `#` or `#/$defs/<name>` against the root schema.
fn resolve_local<'s>(root: &'s SchemaNode, reference: &str) -> Option<&'s SchemaNode> {
    match reference {
        "#" | "#/" => Some(root),
        other => {
            let name = other.strip_prefix("#/$defs/")?;
            root.defs.get(name)
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}.{name}")
    }
}

fn index_path(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// JSON value equality with numbers compared by value.
#[must_use]
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (JsonValue::String(x), JsonValue::String(y)) => x == y,
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x == y,
        (JsonValue::Null, JsonValue::Null) => true,
        _ => canonical(a) == canonical(b),
    }
}

/// Order-independent serialization used as an equality key.
fn canonical(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) => out.push_str(&format!("{f:?}")),
            None => out.push_str(&n.to_string()),
        },
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        JsonValue::Object(map) => write_canonical_object(map, out),
        other => out.push_str(&other.to_string()),
    }
}

fn write_canonical_object(map: &Map<String, JsonValue>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&JsonValue::String(key.clone()).to_string());
        out.push(':');
        write_canonical(&map[key], out);
    }
    out.push('}');
}

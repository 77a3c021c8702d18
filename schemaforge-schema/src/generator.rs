//! Schema generation from type descriptors.
//!
//! [`SchemaGenerator`] is stateless; everything a single `generate` call
//! needs (the set of records currently being walked, collected definitions)
//! lives in a context created per call, so one generator can be shared across
//! threads.
//!
//! # Example
//!
//! ```rust
//! use schemaforge_schema::{Describe, SchemaGenerator, SchemaKind};
//!
//! #[derive(Describe)]
//! struct Weather {
//!     /// City name.
//!     #[schema(required, min_length = 1)]
//!     city: String,
//!     #[schema(minimum = -90.0, maximum = 60.0)]
//!     temperature: f64,
//! }
//!
//! let schema = SchemaGenerator::new().generate::<Weather>().unwrap();
//! assert_eq!(schema.kind, Some(SchemaKind::Object));
//! assert!(schema.is_required("city"));
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::annotation::ConstraintOptions;
use crate::descriptor::{Describe, RecordDescriptor, TypeDescriptor};
use crate::errors::GenerateError;
use crate::schema::{AdditionalProperties, SchemaNode, StringFormat};

/// How a record that contains itself is represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Re-entry yields a bare `{"type": "object"}`.
    #[default]
    Placeholder,
    /// Re-entry yields `{"$ref": "#/$defs/<Name>"}` and the definition is
    /// attached to the root.
    Definitions,
}

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub cycle_policy: CyclePolicy,
    /// Stamp record schemas with their type name when no title is given.
    pub include_titles: bool,
    /// Fail on unknown keys or unparseable values instead of skipping them.
    pub strict_annotations: bool,
    /// Use doc comments as descriptions.
    pub doc_descriptions: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::Placeholder,
            include_titles: false,
            strict_annotations: false,
            doc_descriptions: true,
        }
    }
}

impl GeneratorOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    #[must_use]
    pub fn include_titles(mut self, include: bool) -> Self {
        self.include_titles = include;
        self
    }

    #[must_use]
    pub fn strict_annotations(mut self, strict: bool) -> Self {
        self.strict_annotations = strict;
        self
    }

    #[must_use]
    pub fn doc_descriptions(mut self, enabled: bool) -> Self {
        self.doc_descriptions = enabled;
        self
    }
}

/// Generates JSON Schema documents from type descriptors.
#[derive(Debug, Clone, Default)]
pub struct SchemaGenerator {
    options: GeneratorOptions,
}

impl SchemaGenerator {
    /// Create a generator with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: GeneratorOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate the schema for `T`.
    pub fn generate<T: Describe + ?Sized>(&self) -> Result<SchemaNode, GenerateError> {
        self.generate_descriptor(&T::describe())
    }

    /// Generate the schema for a descriptor.
    pub fn generate_descriptor(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Result<SchemaNode, GenerateError> {
        let mut ctx = GenerationContext::default();
        let mut schema = self.walk(descriptor, &mut ctx)?;
        if !ctx.defs.is_empty() {
            debug!(definitions = ctx.defs.len(), "Attaching schema definitions");
            schema.defs.extend(ctx.defs);
        }
        Ok(schema)
    }

    fn walk(
        &self,
        descriptor: &TypeDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<SchemaNode, GenerateError> {
        match descriptor {
            TypeDescriptor::String => Ok(SchemaNode::string()),
            TypeDescriptor::Boolean => Ok(SchemaNode::boolean()),
            TypeDescriptor::Integer => Ok(SchemaNode::integer()),
            TypeDescriptor::Number => Ok(SchemaNode::number()),
            TypeDescriptor::Null => Ok(SchemaNode::null()),
            TypeDescriptor::Any => Ok(SchemaNode::any()),
            TypeDescriptor::Optional(inner) => self.walk(&inner(), ctx),
            TypeDescriptor::List(inner) => Ok(SchemaNode::array(self.walk(&inner(), ctx)?)),
            TypeDescriptor::Map(inner) => {
                let values = self.walk(&inner(), ctx)?;
                Ok(SchemaNode::object()
                    .with_additional_properties(AdditionalProperties::Typed(Box::new(values))))
            }
            TypeDescriptor::StringEnum {
                description,
                variants,
                ..
            } => {
                let mut schema = SchemaNode::string().with_enum(variants.iter().cloned());
                if self.options.doc_descriptions {
                    schema.description = description.clone();
                }
                Ok(schema)
            }
            TypeDescriptor::Record(record) => self.walk_record(record, ctx),
            TypeDescriptor::Unsupported(name) => Err(GenerateError::unsupported(name.clone())),
        }
    }

    fn walk_record(
        &self,
        record: &RecordDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<SchemaNode, GenerateError> {
        if ctx.visiting.contains(&record.key) {
            debug!(record = %record.name, policy = ?self.options.cycle_policy, "Breaking recursive type");
            return Ok(match self.options.cycle_policy {
                CyclePolicy::Placeholder => SchemaNode::object(),
                CyclePolicy::Definitions => {
                    ctx.referenced.insert(record.key.clone());
                    SchemaNode::reference(def_ref(&ctx.definition_name(record)))
                }
            });
        }

        if let Some(name) = ctx.def_names.get(&record.key) {
            if ctx.defs.contains_key(name) {
                return Ok(SchemaNode::reference(def_ref(name)));
            }
        }

        ctx.visiting.insert(record.key.clone());
        let result = self.record_body(record, ctx);
        ctx.visiting.remove(&record.key);
        let schema = result?;

        if ctx.referenced.remove(&record.key) {
            let name = ctx.definition_name(record);
            ctx.defs.insert(name.clone(), schema.clone());
            if !ctx.visiting.is_empty() {
                return Ok(SchemaNode::reference(def_ref(&name)));
            }
        }
        Ok(schema)
    }

    fn record_body(
        &self,
        record: &RecordDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<SchemaNode, GenerateError> {
        let mut schema = SchemaNode::object();
        if let Some(title) = &record.title {
            schema.title = Some(title.clone());
        } else if self.options.include_titles {
            schema.title = Some(record.name.clone());
        }
        if self.options.doc_descriptions {
            schema.description = record.description.clone();
        }

        for field in record.fields.iter().filter(|f| f.visible) {
            let name = field.serialized_name().to_string();
            let descriptor = (field.ty)();
            let mut property = self
                .walk(&descriptor, ctx)
                .map_err(|e| GenerateError::in_field(&field.name, e))?;

            if self.options.doc_descriptions {
                if let Some(doc) = &field.doc {
                    property.description = Some(doc.clone());
                }
            }

            let options = field.options();
            self.apply_constraints(&mut property, &options, &descriptor)
                .map_err(|e| GenerateError::in_field(&field.name, e))?;

            if options.is_required() {
                schema.add_required(name.clone());
            }
            schema.add_property(name, property);
        }

        Ok(schema)
    }

    fn apply_constraints(
        &self,
        schema: &mut SchemaNode,
        options: &ConstraintOptions,
        descriptor: &TypeDescriptor,
    ) -> Result<(), GenerateError> {
        if let Some(key) = options.unknown_keys().next() {
            if self.options.strict_annotations {
                return Err(GenerateError::invalid_annotation(
                    key,
                    options.get(key).unwrap_or_default(),
                    "unknown key",
                ));
            }
            for key in options.unknown_keys() {
                warn!(key, "Ignoring unknown schema annotation");
            }
        }

        if let Some(desc) = options.get("description") {
            schema.description = Some(desc.to_string());
        }
        if let Some(raw) = options.get("default") {
            schema.default = Some(coerce_default(raw, descriptor));
        }
        if let Some(values) = options.enum_values() {
            schema.enum_values = values.into_iter().map(JsonValue::String).collect();
        }

        if let Some(v) = self.parse_count(options, "minLength")? {
            schema.min_length = Some(v);
        }
        if let Some(v) = self.parse_count(options, "maxLength")? {
            schema.max_length = Some(v);
        }
        if let Some(pattern) = options.get("pattern") {
            schema.pattern = Some(pattern.to_string());
        }
        if let Some(format) = options.get("format") {
            schema.format = Some(StringFormat::from(format));
        }

        if let Some(v) = self.parse_number(options, "minimum")? {
            schema.minimum = Some(v);
        }
        if let Some(v) = self.parse_number(options, "maximum")? {
            schema.maximum = Some(v);
        }

        if let Some(v) = self.parse_count(options, "minItems")? {
            schema.min_items = Some(v);
        }
        if let Some(v) = self.parse_count(options, "maxItems")? {
            schema.max_items = Some(v);
        }

        Ok(())
    }

    fn parse_count(
        &self,
        options: &ConstraintOptions,
        key: &str,
    ) -> Result<Option<usize>, GenerateError> {
        let Some(raw) = options.get(key) else {
            return Ok(None);
        };
        match raw.trim().parse::<usize>() {
            Ok(v) => Ok(Some(v)),
            Err(e) => self.reject(key, raw, &e.to_string()),
        }
    }

    fn parse_number(
        &self,
        options: &ConstraintOptions,
        key: &str,
    ) -> Result<Option<f64>, GenerateError> {
        let Some(raw) = options.get(key) else {
            return Ok(None);
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            Ok(_) => self.reject(key, raw, "value is not finite"),
            Err(e) => self.reject(key, raw, &e.to_string()),
        }
    }

    fn reject<T>(&self, key: &str, raw: &str, reason: &str) -> Result<Option<T>, GenerateError> {
        if self.options.strict_annotations {
            Err(GenerateError::invalid_annotation(key, raw, reason))
        } else {
            warn!(key, value = raw, reason, "Dropping unparseable schema annotation");
            Ok(None)
        }
    }
}

/// Generate the schema for `T` with default options.
pub fn generate<T: Describe + ?Sized>() -> Result<SchemaNode, GenerateError> {
    SchemaGenerator::new().generate::<T>()
}

/// Per-call generation state.
#[derive(Default)]
struct GenerationContext {
    /// Records whose fields are currently being walked.
    visiting: HashSet<String>,
    /// Records that were re-entered while being walked.
    referenced: HashSet<String>,
    defs: IndexMap<String, SchemaNode>,
    /// Record key to definition name.
    def_names: HashMap<String, String>,
}

impl GenerationContext {
    /// The definition name for a record, reserving a unique one on first use.
    fn definition_name(&mut self, record: &RecordDescriptor) -> String {
        if let Some(name) = self.def_names.get(&record.key) {
            return name.clone();
        }
        let mut name = record.name.clone();
        let mut suffix = 2;
        while self.def_names.values().any(|n| *n == name) {
            name = format!("{}{}", record.name, suffix);
            suffix += 1;
        }
        self.def_names.insert(record.key.clone(), name.clone());
        name
    }
}

fn def_ref(name: &str) -> String {
    format!("#/$defs/{name}")
}

/// Interpret a default value according to the field's primitive kind.
///
/// Anything that does not parse is kept as the raw string.
fn coerce_default(raw: &str, descriptor: &TypeDescriptor) -> JsonValue {
    let parsed = match descriptor.clone().unwrap_optional() {
        TypeDescriptor::String | TypeDescriptor::StringEnum { .. } => {
            return JsonValue::String(raw.to_string())
        }
        TypeDescriptor::Boolean => raw.parse::<bool>().ok().map(JsonValue::Bool),
        TypeDescriptor::Integer => raw
            .parse::<i64>()
            .map(JsonValue::from)
            .or_else(|_| raw.parse::<u64>().map(JsonValue::from))
            .ok(),
        TypeDescriptor::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number),
        _ => None,
    };
    parsed.unwrap_or_else(|| JsonValue::String(raw.to_string()))
}

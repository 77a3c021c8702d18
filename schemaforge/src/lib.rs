//! # schemaforge - JSON Schema for Typed LLM Output
//!
//! schemaforge derives JSON Schema documents from Rust types, validates JSON
//! values against them with path-precise diagnostics, and drives a
//! text-generation model to produce values of those types.
//!
//! ## Quick Start
//!
//! ```rust
//! use schemaforge::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Describe, Deserialize)]
//! struct Review {
//!     #[schema(required, enum_values("positive", "negative", "neutral"))]
//!     sentiment: String,
//!     /// How sure the reviewer is
//!     #[schema(minimum = 0, maximum = 1)]
//!     confidence: f64,
//! }
//!
//! let schema = schemaforge::generate::<Review>().unwrap();
//! let errors = schemaforge::validate(
//!     &serde_json::json!({"sentiment": "mixed", "confidence": 0.4}),
//!     &schema,
//! );
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.iter().next().unwrap().path, "sentiment");
//! ```
//!
//! ## Key Features
//!
//! - **Schema generation** from `#[derive(Describe)]` types, honouring serde renames
//! - **Constraint annotations** through `#[schema(...)]` attributes or compact strings
//! - **Validation** that collects every violation with a path like `user.tags[2]`
//! - **Structured output** over any [`CompletionModel`], in native or prompted mode
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|--------|
//! | `macros` | `#[derive(Describe)]` | ✅ |
//! | `full` | All features | ❌ |
//!
//! ## Architecture
//!
//! - [`schemaforge_schema`] - Schema document, generator, formats and validator
//! - [`schemaforge_output`] - Structured output over a completion model
//!
//! Derived code refers to `schemaforge_schema` by path, so crates using
//! `#[derive(Describe)]` depend on it directly.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Schema document, generator, formats and validator.
pub use schemaforge_schema as schema;

/// Structured output over a completion model.
pub use schemaforge_output as output;

// ============================================================================
// Macro Re-exports
// ============================================================================

/// The `Describe` trait, plus its derive macro with the `macros` feature.
pub use schemaforge_schema::Describe;

// ============================================================================
// Type Re-exports (Flat)
// ============================================================================

// Schema document
pub use schemaforge_schema::{AdditionalProperties, SchemaKind, SchemaNode, StringFormat};

// Annotations and descriptors
pub use schemaforge_schema::{
    ConstraintOptions, ConstraintValue, FieldDescriptor, RecordDescriptor, TypeDescriptor,
    TypeRef,
};

// Generation
pub use schemaforge_schema::{generate, CyclePolicy, GeneratorOptions, SchemaGenerator};

// Validation
pub use schemaforge_schema::{
    validate, values_equal, FormatPredicate, FormatRegistry, FormatRegistryBuilder,
    SchemaValidator,
};

// Errors
pub use schemaforge_schema::{GenerateError, SchemaError, ValidationError, ValidationErrors};

// Structured output
pub use schemaforge_output::{
    extract_json, CompletionModel, CompletionRequest, Message, MockModel, ModelError,
    OutputConfig, OutputError, OutputMode, ParseResult, Role, StructuredOutput,
};

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient prelude for common imports.
///
/// ```ignore
/// use schemaforge::prelude::*;
/// ```
pub mod prelude {
    // Schema
    pub use crate::schema::{
        AdditionalProperties, CyclePolicy, Describe, GeneratorOptions, SchemaGenerator,
        SchemaKind, SchemaNode, SchemaValidator, StringFormat,
    };

    // Errors
    pub use crate::schema::{GenerateError, ValidationError, ValidationErrors};

    // Output
    pub use crate::output::{
        CompletionModel, CompletionRequest, Message, ModelError, OutputConfig, OutputError,
        OutputMode, ParseResult, StructuredOutput,
    };
}

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of schemaforge.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Describe, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Order {
        #[schema(required, min_length = 1)]
        order_id: String,
        #[schema(required)]
        customer: Customer,
        #[schema(min_items = 1)]
        line_items: Vec<LineItem>,
    }

    #[derive(Debug, PartialEq, Describe, Serialize, Deserialize)]
    struct Customer {
        #[schema(required)]
        name: String,
        #[schema(format = "email")]
        email: String,
    }

    #[derive(Debug, PartialEq, Describe, Serialize, Deserialize)]
    struct LineItem {
        #[schema(required)]
        sku: String,
        #[schema(minimum = 1)]
        quantity: u32,
    }

    fn order() -> Order {
        Order {
            order_id: "A-1".into(),
            customer: Customer {
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            line_items: vec![LineItem {
                sku: "pen".into(),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }

    #[test]
    fn test_generated_schema_accepts_valid_instance() {
        let schema = generate::<Order>().unwrap();
        let value = serde_json::to_value(order()).unwrap();

        assert!(validate(&value, &schema).is_empty());
        let decoded: Order = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, order());
    }

    #[test]
    fn test_nested_paths() {
        let schema = generate::<Order>().unwrap();
        let value = json!({
            "orderId": "A-1",
            "customer": {"name": 7, "email": "nope"},
            "lineItems": [{"sku": "pen", "quantity": 0}, {"quantity": 1}]
        });

        let errors = validate(&value, &schema);
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "customer.name",
                "customer.email",
                "lineItems[0].quantity",
                "lineItems[1].sku",
            ]
        );
    }

    #[test]
    fn test_structured_output_through_facade() {
        let model = MockModel::new("test").with_response(
            serde_json::to_string(&order()).unwrap(),
        );
        let output = StructuredOutput::<Order, _>::new(model).unwrap();

        let result = tokio_test::block_on(output.generate("Place an order"));
        assert_eq!(result.unwrap(), order());
    }
}

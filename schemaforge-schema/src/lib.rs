//! # schemaforge-schema
//!
//! JSON Schema generation and validation for typed structured output.
//!
//! This crate turns Rust types into JSON Schema documents and checks decoded
//! JSON values against them, reporting every violation with its location.
//!
//! ## Core Concepts
//!
//! - **[`SchemaNode`]**: A JSON Schema document (every nested schema is one too)
//! - **[`Describe`]**: Exposes a type's shape as a [`TypeDescriptor`]
//! - **[`SchemaGenerator`]**: Turns descriptors into schemas
//! - **[`SchemaValidator`]**: Checks values against schemas
//! - **[`FormatRegistry`]**: Named string formats (`email`, `uuid`, `date-time`, ...)
//!
//! ## Generating a Schema
//!
//! ```rust
//! use schemaforge_schema::{Describe, SchemaGenerator};
//!
//! /// Outcome of a grading run.
//! #[derive(Describe)]
//! struct Grade {
//!     #[schema(required, enum_values("success", "failure", "pending"))]
//!     status: String,
//!     #[schema(minimum = 0, maximum = 100)]
//!     score: f64,
//! }
//!
//! let schema = SchemaGenerator::new().generate::<Grade>().unwrap();
//! assert!(schema.is_required("status"));
//! println!("{}", schema.to_json_pretty().unwrap());
//! ```
//!
//! ## Validating a Value
//!
//! ```rust
//! use schemaforge_schema::{SchemaNode, SchemaValidator};
//! use serde_json::json;
//!
//! let schema = SchemaNode::object()
//!     .with_property("score", SchemaNode::number().with_maximum(100.0));
//!
//! let errors = SchemaValidator::new().validate(&json!({"score": 150}), &schema);
//! assert_eq!(errors.to_string(), "score: value 150 exceeds maximum 100");
//! ```
//!
//! ## Annotation Strings
//!
//! Besides structured `#[schema(...)]` keys, a field may carry a compact
//! annotation string: `#[schema(annotation = "required,enum=a,b,c,minimum=0")]`.
//! See [`ConstraintOptions::parse`] for the grammar.

#![deny(unsafe_code)]

extern crate self as schemaforge_schema;

pub mod annotation;
pub mod descriptor;
pub mod errors;
pub mod formats;
pub mod generator;
pub mod schema;
pub mod validator;

pub use annotation::{ConstraintOptions, ConstraintValue};
pub use descriptor::{Describe, FieldDescriptor, RecordDescriptor, TypeDescriptor, TypeRef};
pub use errors::{GenerateError, SchemaError, ValidationError, ValidationErrors};
pub use formats::{FormatPredicate, FormatRegistry, FormatRegistryBuilder};
pub use generator::{generate, CyclePolicy, GeneratorOptions, SchemaGenerator};
pub use schema::{AdditionalProperties, SchemaKind, SchemaNode, StringFormat};
pub use validator::{validate, values_equal, SchemaValidator};

#[cfg(feature = "derive")]
pub use schemaforge_macros::Describe;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AdditionalProperties, ConstraintOptions, CyclePolicy, Describe, FormatRegistry,
        GenerateError, GeneratorOptions, SchemaGenerator, SchemaKind, SchemaNode,
        SchemaValidator, StringFormat, TypeDescriptor, ValidationError, ValidationErrors,
    };
}

//! # schemaforge-output
//!
//! Typed structured output from language models.
//!
//! This crate turns a Rust type into a JSON Schema, conveys the schema to a
//! text-generation model, and validates and decodes the response.
//!
//! ## Core Concepts
//!
//! - **[`StructuredOutput`]**: Schema, model and configuration for one output type
//! - **[`CompletionModel`]**: The text-generation collaborator
//! - **[`OutputMode`]**: How the schema reaches the model (native or prompted)
//! - **[`ParseResult`]**: Decoded value, raw text and every violation
//! - **[`MockModel`]**: Scripted collaborator for tests
//!
//! ## Output Modes
//!
//! - **Native**: The schema is attached to the request and the model returns bare JSON
//! - **Prompted**: The schema is embedded in a system instruction and JSON is
//!   extracted from the free-text reply
//!
//! The mode is picked from [`CompletionModel::supports_native_structured_output`]
//! unless [`OutputConfig::mode`] forces one.
//!
//! ## Example
//!
//! ```rust
//! use schemaforge_output::{MockModel, StructuredOutput};
//! use schemaforge_schema::Describe;
//! use serde::Deserialize;
//!
//! #[derive(Describe, Deserialize)]
//! struct Person {
//!     #[schema(required)]
//!     name: String,
//!     #[schema(minimum = 0)]
//!     age: u32,
//! }
//!
//! # tokio_test::block_on(async {
//! let model = MockModel::new("test").with_response(r#"{"name": "Alice", "age": 30}"#);
//! let output = StructuredOutput::<Person, _>::new(model).unwrap();
//!
//! let person = output.generate("Who wrote the first program?").await.unwrap();
//! assert_eq!(person.name, "Alice");
//! # });
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod extract;
pub mod mock;
pub mod mode;
pub mod model;
pub mod structured;

// Re-exports
pub use error::{ModelError, OutputError};
pub use extract::{build_native_instruction, build_prompt, extract_json, looks_like_json};
pub use mock::MockModel;
pub use mode::{OutputConfig, OutputMode};
pub use model::{CompletionModel, CompletionRequest, Message, Role};
pub use structured::{ParseResult, StructuredOutput};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CompletionModel, CompletionRequest, Message, ModelError, OutputConfig, OutputError,
        OutputMode, ParseResult, Role, StructuredOutput,
    };
}

//! # schemaforge-macros
//!
//! Procedural macros for schemaforge.
//!
//! This crate provides `#[derive(Describe)]`, which exposes a type's shape to
//! the schema generator. Use it through `schemaforge` or
//! `schemaforge-schema`, which re-export it next to the `Describe` trait.
//!
//! ```ignore
//! #[derive(Describe, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct WeatherReport {
//!     /// City the report is for
//!     #[schema(required, min_length = 1)]
//!     city_name: String,
//!     #[schema(minimum = -90, maximum = 60)]
//!     temperature: f64,
//! }
//! ```

extern crate proc_macro;

mod describe;
mod utils;

use proc_macro::TokenStream;

/// Derive macro for implementing the `Describe` trait.
///
/// Structs with named fields become records, newtype structs describe their
/// inner type, and enums whose variants carry no data become string
/// enumerations. Type parameters receive a `Describe` bound.
///
/// # Attributes
///
/// Container:
///
/// - `#[schema(description = "...")]` - Record description (default: doc comment)
/// - `#[schema(title = "...")]` - Record title
///
/// Field:
///
/// - `#[schema(required)]` - Add the field to `required`
/// - `#[schema(description = "...")]` - Override the doc comment
/// - `#[schema(default = ...)]` - Default value, coerced by the field type
/// - `#[schema(enum_values("a", "b"))]` - Allowed values
/// - `#[schema(minimum = 0, maximum = 100)]` - Numeric bounds
/// - `#[schema(min_length = 1, max_length = 50)]` - String length
/// - `#[schema(pattern = "^[a-z]+$", format = "email")]` - String shape
/// - `#[schema(min_items = 1, max_items = 10)]` - Array size
/// - `#[schema(annotation = "required,enum=a,b,c")]` - Compact annotation string
/// - `#[schema(skip)]` - Leave the field out
///
/// `#[serde(rename, rename_all, skip, skip_serializing, skip_deserializing)]`
/// are honoured so the schema matches the serialized form.
///
/// # Example
///
/// ```ignore
/// /// A support ticket triage result.
/// #[derive(Describe, Deserialize)]
/// struct Triage {
///     #[schema(required, enum_values("low", "medium", "high"))]
///     priority: String,
///     /// Short summary of the issue
///     summary: String,
///     labels: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Describe, attributes(schema, serde))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    describe::derive_describe_impl(input)
}

//! Error types for schema generation and validation.
//!
//! Generation failures are real errors ([`GenerateError`]). Validation
//! violations are data: the validator never fails, it returns a
//! [`ValidationErrors`] list which is empty when the value conforms.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while turning a type descriptor into a schema.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The descriptor has no schema mapping.
    #[error("unsupported type: {type_name}")]
    UnsupportedType {
        /// Name of the offending type.
        type_name: String,
    },

    /// A field's schema could not be generated.
    #[error("field {field}: {source}")]
    Field {
        /// Name of the field.
        field: String,
        /// Underlying failure.
        #[source]
        source: Box<GenerateError>,
    },

    /// An annotation value could not be applied (strict mode only).
    #[error("invalid annotation {key}={value}: {reason}")]
    InvalidAnnotation {
        /// Annotation key.
        key: String,
        /// Raw annotation value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl GenerateError {
    /// Create an unsupported type error.
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Wrap an error with the field it came from.
    pub fn in_field(field: impl Into<String>, source: GenerateError) -> Self {
        Self::Field {
            field: field.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid annotation error.
    pub fn invalid_annotation(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAnnotation {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// The innermost error, past any field wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &GenerateError {
        match self {
            Self::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Dotted path of the fields the error passed through.
    #[must_use]
    pub fn field_path(&self) -> String {
        let mut parts = Vec::new();
        let mut current = self;
        while let Self::Field { field, source } = current {
            parts.push(field.as_str());
            current = source;
        }
        parts.join(".")
    }
}

/// Errors converting schema documents to and from JSON.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location of the offending value; empty at the root.
    pub path: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    /// Create a new violation.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// An ordered list of violations. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a violation.
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Record a violation from its parts.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError::new(path, message));
    }

    /// Append every violation from another list.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// True when there are no violations.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Violations reported at exactly this path.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.0.iter().filter(move |e| e.path == path)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("no validation errors"),
            [only] => write!(f, "{only}"),
            all => {
                write!(f, "validation failed with {} errors: ", all.len())?;
                for (i, error) in all.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("user.name", "required field is missing");
        assert_eq!(err.to_string(), "user.name: required field is missing");

        let root = ValidationError::new("", "expected object, got string");
        assert_eq!(root.to_string(), "expected object, got string");
    }

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.to_string(), "no validation errors");

        errors.add("a", "bad");
        assert_eq!(errors.to_string(), "a: bad");

        errors.add("b", "worse");
        assert_eq!(
            errors.to_string(),
            "validation failed with 2 errors: a: bad; b: worse"
        );
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let errors: ValidationErrors = vec![ValidationError::new("x", "y")].into();
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.at("x").count(), 1);
    }

    #[test]
    fn test_generate_error_field_path() {
        let err = GenerateError::in_field(
            "outer",
            GenerateError::in_field("inner", GenerateError::unsupported("fn()")),
        );
        assert_eq!(err.field_path(), "outer.inner");
        assert!(matches!(
            err.root_cause(),
            GenerateError::UnsupportedType { type_name } if type_name == "fn()"
        ));
        assert_eq!(err.to_string(), "field outer: field inner: unsupported type: fn()");
    }

    #[test]
    fn test_errors_serialize_as_list() {
        let errors: ValidationErrors = vec![ValidationError::new("p", "m")].into();
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!([{"path": "p", "message": "m"}]));
    }
}

//! Type descriptors: the introspected shape of a Rust type.
//!
//! A [`TypeDescriptor`] is what the [`SchemaGenerator`](crate::SchemaGenerator)
//! walks. Types expose theirs through [`Describe`], which is implemented here
//! for the standard library and derived for application types with
//! `#[derive(Describe)]`.
//!
//! Nested types are referenced through [`TypeRef`] function pointers and only
//! resolved when the generator reaches them, so a record may contain itself
//! (through `Box`, `Vec`, `Option`, ...) without infinite recursion at
//! description time.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::annotation::ConstraintOptions;

/// Lazily resolved descriptor of a nested type.
pub type TypeRef = fn() -> TypeDescriptor;

/// Describes the shape of a type for schema generation.
pub trait Describe {
    /// Describe this type.
    fn describe() -> TypeDescriptor;
}

/// The shape of a type.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    /// Text.
    String,
    /// `true`/`false`.
    Boolean,
    /// Whole numbers.
    Integer,
    /// Floating point numbers.
    Number,
    /// The unit value, serialized as `null`.
    Null,
    /// Any JSON value.
    Any,
    /// An optional value of the inner type.
    Optional(TypeRef),
    /// A sequence of the element type.
    List(TypeRef),
    /// A string-keyed map with values of the inner type.
    Map(TypeRef),
    /// A closed set of string values.
    StringEnum {
        /// Type name.
        name: String,
        /// Doc text.
        description: Option<String>,
        /// Serialized variant names, in declaration order.
        variants: Vec<String>,
    },
    /// A struct with named fields.
    Record(RecordDescriptor),
    /// A type with no JSON Schema mapping.
    Unsupported(String),
}

impl TypeDescriptor {
    /// A short name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            TypeDescriptor::String => "string".into(),
            TypeDescriptor::Boolean => "boolean".into(),
            TypeDescriptor::Integer => "integer".into(),
            TypeDescriptor::Number => "number".into(),
            TypeDescriptor::Null => "null".into(),
            TypeDescriptor::Any => "any".into(),
            TypeDescriptor::Optional(inner) => format!("optional<{}>", inner().type_name()),
            TypeDescriptor::List(inner) => format!("list<{}>", inner().type_name()),
            TypeDescriptor::Map(inner) => format!("map<{}>", inner().type_name()),
            TypeDescriptor::StringEnum { name, .. } => name.clone(),
            TypeDescriptor::Record(record) => record.name.clone(),
            TypeDescriptor::Unsupported(name) => name.clone(),
        }
    }

    /// The descriptor with optional wrappers removed.
    #[must_use]
    pub fn unwrap_optional(self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner().unwrap_optional(),
            other => other,
        }
    }
}

/// A struct with named fields.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    /// Unique identity of the type, used for cycle detection.
    pub key: String,
    /// Display name, used for titles and definition names.
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Create a record descriptor.
    ///
    /// `key` must be unique per type; derived impls use
    /// `std::any::type_name::<Self>()`.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            title: None,
            description: None,
            fields: Vec::new(),
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
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// One field of a record.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub name: String,
    /// Serialized name override.
    pub rename: Option<String>,
    pub ty: TypeRef,
    /// Legacy annotation string.
    pub annotation: Option<String>,
    /// Structured constraints; take precedence over `annotation`.
    pub constraints: ConstraintOptions,
    pub doc: Option<String>,
    /// Hidden fields are left out of the schema.
    pub visible: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            rename: None,
            ty,
            annotation: None,
            constraints: ConstraintOptions::new(),
            doc: None,
            visible: true,
        }
    }

    /// A field of type `T`.
    pub fn of<T: Describe + ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, T::describe)
    }

    #[must_use]
    pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: ConstraintOptions) -> Self {
        self.constraints = constraints;
        self
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// The name used on the wire.
    #[must_use]
    pub fn serialized_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    /// Effective constraints: the parsed annotation overlaid with the
    /// structured constraints.
    #[must_use]
    pub fn options(&self) -> ConstraintOptions {
        let mut options = self
            .annotation
            .as_deref()
            .map(ConstraintOptions::parse)
            .unwrap_or_default();
        options.merge(self.constraints.clone());
        options
    }
}

macro_rules! describe_as {
    ($variant:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::$variant
                }
            }
        )+
    };
}

describe_as!(String => String, str, char);
describe_as!(Boolean => bool);
describe_as!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(Number => f32, f64);
describe_as!(Null => ());
describe_as!(Any => serde_json::Value);

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe + ?Sized> Describe for &mut T {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe + ?Sized> Describe for Rc<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe + ToOwned + ?Sized> Describe for Cow<'_, T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Optional(T::describe)
    }
}

macro_rules! describe_list {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl<T: Describe> Describe for $ty<T> {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::List(T::describe)
                }
            }
        )+
    };
}

describe_list!(Vec, VecDeque, LinkedList, BTreeSet);

impl<T: Describe> Describe for [T] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::List(T::describe)
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::List(T::describe)
    }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::List(T::describe)
    }
}

impl<T: Describe, S> Describe for IndexSet<T, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::List(T::describe)
    }
}

impl<K, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Map(V::describe)
    }
}

impl<K, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Map(V::describe)
    }
}

impl<K, V: Describe, S> Describe for IndexMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Map(V::describe)
    }
}

impl Describe for serde_json::Map<String, serde_json::Value> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Map(serde_json::Value::describe)
    }
}

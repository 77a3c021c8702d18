//! Attribute helpers shared by the derive implementations.

use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Lit, Meta, Token};

/// Collect `///` doc comments into one line.
pub fn doc_string(attrs: &[Attribute]) -> Option<String> {
    let text = attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| {
            if let Meta::NameValue(nv) = &a.meta {
                if let Expr::Lit(lit) = &nv.value {
                    if let Lit::Str(s) = &lit.lit {
                        return Some(s.value().trim().to_string());
                    }
                }
            }
            None
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The subset of `#[serde(...)]` that changes the wire shape.
#[derive(Default)]
pub struct SerdeAttrs {
    pub rename: Option<String>,
    pub rename_all: Option<RenameRule>,
    pub skip: bool,
}

impl SerdeAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = SerdeAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            for item in items {
                match &item {
                    Meta::Path(path)
                        if path.is_ident("skip")
                            || path.is_ident("skip_serializing")
                            || path.is_ident("skip_deserializing") =>
                    {
                        out.skip = true;
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                        out.rename = Some(expr_str(&nv.value)?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("rename_all") => {
                        let rule = expr_str(&nv.value)?;
                        out.rename_all = Some(RenameRule::parse(&rule).ok_or_else(|| {
                            syn::Error::new_spanned(&nv.value, format!("unknown rename rule `{rule}`"))
                        })?);
                    }
                    Meta::List(list)
                        if list.path.is_ident("rename") || list.path.is_ident("rename_all") =>
                    {
                        let nested = list
                            .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
                        for inner in nested {
                            if let Meta::NameValue(nv) = inner {
                                if nv.path.is_ident("serialize") {
                                    let value = expr_str(&nv.value)?;
                                    if list.path.is_ident("rename") {
                                        out.rename = Some(value);
                                    } else {
                                        out.rename_all = RenameRule::parse(&value);
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(out)
    }
}

fn expr_str(expr: &Expr) -> syn::Result<String> {
    if let Expr::Lit(lit) = expr {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(expr, "expected a string literal"))
}

/// Render a literal (optionally negated) as text.
pub fn literal_text(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.value()),
            Lit::Int(i) => Ok(i.base10_digits().to_string()),
            Lit::Float(f) => Ok(f.base10_digits().to_string()),
            Lit::Bool(b) => Ok(b.value.to_string()),
            other => Err(syn::Error::new_spanned(other, "unsupported literal")),
        },
        Expr::Unary(unary) if matches!(unary.op, syn::UnOp::Neg(_)) => {
            Ok(format!("-{}", literal_text(&unary.expr)?))
        }
        Expr::Group(group) => literal_text(&group.expr),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

/// `#[serde(rename_all = "...")]` conventions.
#[derive(Clone, Copy)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    /// Apply to a snake_case field name.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => to_pascal_case(field),
            Self::Camel => {
                let pascal = to_pascal_case(field);
                lower_first(&pascal)
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }

    /// Apply to a PascalCase variant name.
    pub fn apply_to_variant(self, variant: &str) -> String {
        match self {
            Self::Pascal => variant.to_string(),
            Self::Lower => variant.to_ascii_lowercase(),
            Self::Upper => variant.to_ascii_uppercase(),
            Self::Camel => lower_first(variant),
            Self::Snake => to_snake_case(variant),
            Self::ScreamingSnake => to_snake_case(variant).to_ascii_uppercase(),
            Self::Kebab => to_snake_case(variant).replace('_', "-"),
            Self::ScreamingKebab => to_snake_case(variant).to_ascii_uppercase().replace('_', "-"),
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

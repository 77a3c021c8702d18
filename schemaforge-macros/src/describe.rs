//! `#[derive(Describe)]` implementation.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, parse_quote, Data, DataEnum, DeriveInput, Field, Fields, LitStr, Token,
};

use crate::utils::{doc_string, literal_text, SerdeAttrs};

/// Implementation for `#[derive(Describe)]`
pub fn derive_describe_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::schemaforge_schema::Describe));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => describe_record(input, fields.named.iter())?,
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                let inner = &fields.unnamed[0].ty;
                quote!(<#inner as ::schemaforge_schema::Describe>::describe())
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Describe cannot be derived for tuple structs with more than one field",
                ))
            }
            Fields::Unit => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Describe cannot be derived for unit structs",
                ))
            }
        },
        Data::Enum(data) => describe_enum(input, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Describe cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics ::schemaforge_schema::Describe for #name #ty_generics #where_clause {
            fn describe() -> ::schemaforge_schema::TypeDescriptor {
                #body
            }
        }
    })
}

/// Container-level `#[schema(...)]` options.
#[derive(Default)]
struct ContainerAttrs {
    title: Option<String>,
    description: Option<String>,
}

fn container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("description") {
                let lit: LitStr = meta.value()?.parse()?;
                out.description = Some(lit.value());
            } else if meta.path.is_ident("title") {
                let lit: LitStr = meta.value()?.parse()?;
                out.title = Some(lit.value());
            } else {
                return Err(meta.error("unknown `schema` container attribute"));
            }
            Ok(())
        })?;
    }
    if out.description.is_none() {
        out.description = doc_string(&input.attrs);
    }
    Ok(out)
}

fn describe_record<'a>(
    input: &DeriveInput,
    fields: impl Iterator<Item = &'a Field>,
) -> syn::Result<TokenStream2> {
    let container = container_attrs(input)?;
    let serde = SerdeAttrs::from_attrs(&input.attrs)?;
    let record_name = serde.rename.clone().unwrap_or_else(|| input.ident.to_string());

    let mut field_tokens = Vec::new();
    for field in fields {
        field_tokens.push(describe_field(field, &serde)?);
    }

    let title = container
        .title
        .map(|t| quote!(.with_title(#t)));
    let description = container
        .description
        .map(|d| quote!(.with_description(#d)));

    Ok(quote! {
        ::schemaforge_schema::TypeDescriptor::Record(
            ::schemaforge_schema::RecordDescriptor::new(
                ::std::any::type_name::<Self>(),
                #record_name,
            )
            #title
            #description
            #(.with_field(#field_tokens))*
        )
    })
}

/// Field-level `#[schema(...)]` options.
#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    annotation: Option<String>,
    /// Constraint calls in declaration order.
    constraints: Vec<TokenStream2>,
}

fn field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            let Some(ident) = meta.path.get_ident().map(|i| i.to_string()) else {
                return Err(meta.error("expected an identifier"));
            };
            match ident.as_str() {
                "required" => out.constraints.push(quote!(.with_flag("required"))),
                "skip" => out.skip = true,
                "annotation" => {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.annotation = Some(lit.value());
                }
                "enum_values" => {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let values = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                    let values = values.iter().map(LitStr::value);
                    out.constraints
                        .push(quote!(.with_list("enum", [#(#values),*])));
                }
                "description" | "default" | "pattern" | "format" | "minimum" | "maximum"
                | "min_length" | "max_length" | "min_items" | "max_items" => {
                    let expr: syn::Expr = meta.value()?.parse()?;
                    let value = literal_text(&expr)?;
                    let key = constraint_key(&ident);
                    out.constraints.push(quote!(.with(#key, #value)));
                }
                _ => return Err(meta.error(format!("unknown `schema` field attribute `{ident}`"))),
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Annotation key for a structured attribute name.
fn constraint_key(ident: &str) -> &str {
    match ident {
        "min_length" => "minLength",
        "max_length" => "maxLength",
        "min_items" => "minItems",
        "max_items" => "maxItems",
        other => other,
    }
}

fn describe_field(field: &Field, container: &SerdeAttrs) -> syn::Result<TokenStream2> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let name = ident.to_string();
    let name = name.strip_prefix("r#").unwrap_or(&name).to_string();

    let serde = SerdeAttrs::from_attrs(&field.attrs)?;
    let attrs = field_attrs(field)?;

    if serde.skip || attrs.skip {
        return Ok(quote! {
            ::schemaforge_schema::FieldDescriptor::new(
                #name,
                <() as ::schemaforge_schema::Describe>::describe,
            )
            .hidden()
        });
    }

    let rename = serde
        .rename
        .or_else(|| container.rename_all.map(|rule| rule.apply_to_field(&name)))
        .filter(|renamed| *renamed != name)
        .map(|r| quote!(.with_rename(#r)));
    let doc = doc_string(&field.attrs).map(|d| quote!(.with_doc(#d)));
    let annotation = attrs.annotation.map(|a| quote!(.with_annotation(#a)));
    let constraints = if attrs.constraints.is_empty() {
        None
    } else {
        let calls = &attrs.constraints;
        Some(quote! {
            .with_constraints(::schemaforge_schema::ConstraintOptions::new() #(#calls)*)
        })
    };

    let ty = &field.ty;
    Ok(quote! {
        ::schemaforge_schema::FieldDescriptor::new(
            #name,
            <#ty as ::schemaforge_schema::Describe>::describe,
        )
        #rename
        #doc
        #annotation
        #constraints
    })
}

fn describe_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    let container = container_attrs(input)?;
    let serde = SerdeAttrs::from_attrs(&input.attrs)?;
    let enum_name = serde.rename.clone().unwrap_or_else(|| input.ident.to_string());

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Describe can only be derived for enums whose variants carry no data",
            ));
        }
        let variant_serde = SerdeAttrs::from_attrs(&variant.attrs)?;
        if variant_serde.skip {
            continue;
        }
        let ident = variant.ident.to_string();
        let wire = variant_serde
            .rename
            .or_else(|| serde.rename_all.map(|rule| rule.apply_to_variant(&ident)))
            .unwrap_or(ident);
        variants.push(wire);
    }

    let description = match container.description {
        Some(d) => quote!(::std::option::Option::Some(::std::string::String::from(#d))),
        None => quote!(::std::option::Option::None),
    };

    Ok(quote! {
        ::schemaforge_schema::TypeDescriptor::StringEnum {
            name: ::std::string::String::from(#enum_name),
            description: #description,
            variants: ::std::vec![#(::std::string::String::from(#variants)),*],
        }
    })
}

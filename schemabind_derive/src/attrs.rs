// Copyright 2025 Oxide Computer Company

//! Parsing of `#[openapi(...)]` and `#[serde(...)]` attributes.

use crate::doc::extract_doc_from_attrs;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::Token;

/// Attributes of one struct field, resolved into tags.
#[derive(Debug, Default)]
pub(crate) struct FieldAttrs {
    /// Tags in declaration order.
    pub tags: Vec<(String, String)>,
    pub embed: bool,
}

impl FieldAttrs {
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.iter().any(|(k, _)| k == key)
    }
}

/// Attributes of the struct itself.
#[derive(Debug, Default)]
pub(crate) struct ContainerAttrs {
    pub rename: Option<String>,
    pub inline: bool,
    pub description: Option<String>,
}

/// What we take from serde.  Anything serde accepts that is not listed here
/// is skipped, and serde attributes we cannot parse are left for serde to
/// complain about.
#[derive(Debug, Default)]
struct SerdeAttrs {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
}

pub(crate) fn field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("openapi") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let key = meta_key(&meta)?;
            if meta.input.peek(Token![=]) {
                let value = literal_text(&meta.value()?.parse()?)?;
                if out.has_tag(&key) {
                    return Err(meta.error(format!("duplicate tag `{}`", key)));
                }
                out.tags.push((key, value));
                Ok(())
            } else if key == "embed" {
                out.embed = true;
                Ok(())
            } else {
                Err(meta.error(format!(
                    "expected `{} = \"...\"` or `embed`",
                    key
                )))
            }
        })?;
    }

    let serde = serde_attrs(&field.attrs);
    if !out.has_tag("json") {
        if serde.skip {
            out.tags.push(("json".to_string(), "-".to_string()));
        } else if let Some(rename) = serde.rename {
            out.tags.push(("json".to_string(), rename));
        }
    }
    if serde.flatten {
        out.embed = true;
    }

    if !out.has_tag("description") {
        if let Some(doc) = extract_doc_from_attrs(&field.attrs) {
            out.tags.push(("description".to_string(), doc));
        }
    }

    Ok(out)
}

pub(crate) fn container_attrs(
    attrs: &[syn::Attribute],
) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("openapi") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let name: syn::LitStr = meta.value()?.parse()?;
                if name.value().is_empty() {
                    return Err(syn::Error::new_spanned(
                        name,
                        "schema name must not be empty",
                    ));
                }
                out.rename = Some(name.value());
                Ok(())
            } else if meta.path.is_ident("inline") {
                out.inline = true;
                Ok(())
            } else {
                Err(meta.error("expected `rename = \"...\"` or `inline`"))
            }
        })?;
    }

    if out.rename.is_some() && out.inline {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "an inline struct cannot be renamed",
        ));
    }
    if out.rename.is_none() && !out.inline {
        out.rename = serde_attrs(attrs).rename;
    }
    out.description = extract_doc_from_attrs(attrs);

    Ok(out)
}

fn meta_key(meta: &ParseNestedMeta) -> syn::Result<String> {
    // Keywords such as `enum` are fine as keys.
    meta.path
        .get_ident()
        .map(|ident| ident.unraw().to_string())
        .ok_or_else(|| meta.error("expected a tag name"))
}

/// Tag values are text; other literals are accepted as their source text.
fn literal_text(lit: &syn::Lit) -> syn::Result<String> {
    match lit {
        syn::Lit::Str(s) => Ok(s.value()),
        syn::Lit::Bool(b) => Ok(b.value.to_string()),
        syn::Lit::Int(i) => Ok(i.base10_digits().to_string()),
        syn::Lit::Float(f) => Ok(f.base10_digits().to_string()),
        other => Err(syn::Error::new_spanned(
            other,
            "expected a string, boolean or number",
        )),
    }
}

fn serde_attrs(attrs: &[syn::Attribute]) -> SerdeAttrs {
    let mut out = SerdeAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let name: syn::LitStr = meta.value()?.parse()?;
                    out.rename = Some(name.value());
                } else {
                    // rename(serialize = "...", deserialize = "...")
                    meta.parse_nested_meta(|inner| {
                        let name: syn::LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            out.rename = Some(name.value());
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("skip")
                || meta.path.is_ident("skip_serializing")
            {
                out.skip = true;
            } else if meta.path.is_ident("flatten") {
                out.flatten = true;
            } else if meta.input.peek(Token![=]) {
                meta.value()?.parse::<syn::Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<proc_macro2::TokenStream>()?;
            }
            Ok(())
        });
    }
    out
}

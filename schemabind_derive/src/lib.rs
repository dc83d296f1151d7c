// Copyright 2025 Oxide Computer Company

//! Derive macro for schemabind's `Describe` trait.
//!
//! This crate is re-exported by `schemabind`; see its documentation for the
//! attributes understood here.

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;

mod attrs;
mod doc;

use attrs::container_attrs;
use attrs::field_attrs;

const LOCATION_TAGS: [&str; 3] = ["path", "query", "header"];

#[proc_macro_derive(Describe, attributes(openapi, serde))]
pub fn derive_describe(
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    match do_describe(item.into()) {
        Ok(result) => result.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn do_describe(item: TokenStream) -> Result<TokenStream, syn::Error> {
    let input: syn::DeriveInput = syn::parse2(item)?;

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => named.named.iter().collect(),
            syn::Fields::Unit => Vec::new(),
            syn::Fields::Unnamed(unnamed) => {
                return Err(syn::Error::new(
                    unnamed.span(),
                    "Describe can only be derived for structs with named \
                     fields",
                ));
            }
        },
        syn::Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span,
                "Describe cannot be derived for enums",
            ));
        }
        syn::Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span,
                "Describe cannot be derived for unions",
            ));
        }
    };

    let mut generics = input.generics.clone();
    if let Some(lifetime) = generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "described types must be 'static and cannot have lifetime \
             parameters",
        ));
    }
    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(::schemabind::Describe));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let field_descriptors = fields
        .into_iter()
        .map(field_descriptor)
        .collect::<Result<Vec<_>, _>>()?;

    let container = container_attrs(&input.attrs)?;
    let mut descriptor = quote! {
        ::schemabind::TypeDescriptor::structure::<Self>(
            ::std::vec![#(#field_descriptors),*]
        )
    };
    if let Some(name) = &container.rename {
        descriptor = quote! { #descriptor.named(#name) };
    }
    if container.inline {
        descriptor = quote! { #descriptor.anonymous() };
    }
    if let Some(description) = &container.description {
        descriptor = quote! { #descriptor.with_description(#description) };
    }

    let name = &input.ident;
    Ok(quote! {
        impl #impl_generics ::schemabind::Describe
            for #name #ty_generics #where_clause
        {
            fn describe() -> ::schemabind::TypeDescriptor {
                #descriptor
            }
        }
    })
}

fn field_descriptor(field: &syn::Field) -> Result<TokenStream, syn::Error> {
    let Some(ident) = &field.ident else {
        return Err(syn::Error::new(field.span(), "expected a named field"));
    };
    let name = ident.unraw().to_string();
    let attrs = field_attrs(field)?;

    if !matches!(field.vis, syn::Visibility::Public(_)) {
        return Ok(quote! { ::schemabind::FieldDescriptor::private(#name) });
    }

    let ty = &field.ty;
    let mut out = quote! {
        ::schemabind::FieldDescriptor::new(
            #name,
            <#ty as ::schemabind::Describe>::describe,
        )
    };
    for (key, value) in &attrs.tags {
        out = quote! { #out.tag(#key, #value) };
    }

    if attrs.embed {
        let slot = embedded_slot(quote! { &mut target.#ident }, ty);
        out = quote! {
            #out.embedded().with_embedded_access(
                |target: &mut dyn ::std::any::Any| {
                    let target = target.downcast_mut::<Self>()?;
                    let slot = #slot;
                    ::std::option::Option::Some(
                        slot as &mut dyn ::std::any::Any
                    )
                }
            )
        };
    } else if LOCATION_TAGS.iter().any(|tag| attrs.has_tag(tag)) {
        out = quote! {
            #out.with_assign(
                |target: &mut dyn ::std::any::Any,
                 value: ::schemabind::Value| {
                    let target = target
                        .downcast_mut::<Self>()
                        .ok_or_else(::schemabind::access_mismatch::<Self>)?;
                    target.#ident =
                        <#ty as ::schemabind::FromParam>::from_param(value)?;
                    ::std::result::Result::Ok(())
                }
            )
        };
    }

    Ok(out)
}

/// Builds an expression reaching through `Option` and `Box` layers of `ty`
/// to the embedded struct, creating absent values with `Default`.
fn embedded_slot(mut expr: TokenStream, mut ty: &syn::Type) -> TokenStream {
    loop {
        match wrapper(ty) {
            Some(("Option", inner)) => {
                expr = quote! {
                    (#expr).get_or_insert_with(::std::default::Default::default)
                };
                ty = inner;
            }
            Some(("Box", inner)) => {
                expr = quote! { &mut **(#expr) };
                ty = inner;
            }
            _ => return expr,
        }
    }
}

/// Recognizes `Option<T>` and `Box<T>` (under any path), returning the
/// wrapper's name and `T`.
fn wrapper(ty: &syn::Type) -> Option<(&'static str, &syn::Type)> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    let name = if segment.ident == "Option" {
        "Option"
    } else if segment.ident == "Box" {
        "Box"
    } else {
        return None;
    };
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(syn::GenericArgument::Type(inner)) if args.args.len() == 1 => {
            Some((name, inner))
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::do_describe;
    use super::embedded_slot;
    use quote::quote;

    fn describe(item: syn::ItemStruct) -> Result<syn::ItemImpl, String> {
        do_describe(quote! { #item })
            .map(|tokens| syn::parse2(tokens).unwrap())
            .map_err(|e| e.to_string())
    }

    fn error(tokens: proc_macro2::TokenStream) -> String {
        do_describe(tokens).unwrap_err().to_string()
    }

    fn body(item: &syn::ItemImpl) -> String {
        let syn::ImplItem::Fn(f) = &item.items[0] else {
            panic!("expected a function");
        };
        let block = &f.block;
        quote!(#block).to_string()
    }

    #[test]
    fn test_plain_struct() {
        let item = describe(syn::parse_quote! {
            /// A pet.
            pub struct Pet {
                pub id: u64,
                #[openapi(query = "name", example = "Rex")]
                pub name: String,
                secret: String,
            }
        })
        .unwrap();

        let self_ty = &item.self_ty;
        assert_eq!(quote!(#self_ty).to_string(), "Pet");
        let body = body(&item);
        let expected_id = quote! {
            ::schemabind::FieldDescriptor::new(
                "id",
                <u64 as ::schemabind::Describe>::describe,
            )
        };
        assert!(body.contains(&expected_id.to_string()));
        assert!(body.contains(
            &quote!(.tag("query", "name").tag("example", "Rex")).to_string()
        ));
        assert!(body.contains(
            &quote!(::schemabind::FieldDescriptor::private("secret"))
                .to_string()
        ));
        assert!(body.contains(&quote!(.with_assign).to_string()));
        assert!(body.contains(&quote!(.with_description("A pet.")).to_string()));
        assert!(!body.contains("named"));
    }

    #[test]
    fn test_generics() {
        let item = describe(syn::parse_quote! {
            #[openapi(rename = "Page")]
            pub struct Page<T, const N: usize> where T: Clone {
                pub items: Vec<T>,
                pub r#type: [u8; N],
            }
        })
        .unwrap();

        let generics = &item.generics;
        assert_eq!(
            quote!(#generics).to_string(),
            quote!(<T: ::schemabind::Describe, const N: usize>).to_string()
        );
        let where_clause = &item.generics.where_clause;
        assert_eq!(
            quote!(#where_clause).to_string(),
            quote!(where T: Clone).to_string()
        );
        let body = body(&item);
        assert!(body.contains(&quote!(.named("Page")).to_string()));
        // Raw identifiers are named without their prefix.
        assert!(body.contains("\"type\""));
    }

    #[test]
    fn test_embedded_slot() {
        let ty: syn::Type = syn::parse_quote!(Option<Box<Paging>>);
        let slot = embedded_slot(quote!(&mut target.paging), &ty);
        assert_eq!(
            slot.to_string(),
            quote! {
                &mut **((&mut target.paging)
                    .get_or_insert_with(::std::default::Default::default))
            }
            .to_string()
        );

        let ty: syn::Type = syn::parse_quote!(Paging);
        let slot = embedded_slot(quote!(&mut target.paging), &ty);
        assert_eq!(slot.to_string(), quote!(&mut target.paging).to_string());

        let item = describe(syn::parse_quote! {
            pub struct Search {
                #[serde(flatten)]
                pub paging: std::option::Option<Paging>,
            }
        })
        .unwrap();
        let body = body(&item);
        assert!(body.contains(&quote!(.embedded()).to_string()));
        assert!(body.contains("get_or_insert_with"));
        assert!(!body.contains("with_assign"));
    }

    #[test]
    fn test_unit_struct() {
        let item = describe(syn::parse_quote! {
            #[openapi(inline)]
            pub struct Empty;
        })
        .unwrap();
        let body = body(&item);
        assert!(body.contains(&quote!(::std::vec![]).to_string()));
        assert!(body.contains(&quote!(.anonymous()).to_string()));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            error(quote! { pub struct Pair(pub u32, pub u32); }),
            "Describe can only be derived for structs with named fields"
        );
        assert_eq!(
            error(quote! { pub enum Color { Red, Green } }),
            "Describe cannot be derived for enums"
        );
        assert_eq!(
            error(quote! { pub union Bits { a: u32, b: f32 } }),
            "Describe cannot be derived for unions"
        );
        assert_eq!(
            error(quote! { pub struct Borrowed<'a> { pub name: &'a str } }),
            "described types must be 'static and cannot have lifetime \
             parameters"
        );
        assert_eq!(
            error(quote! {
                pub struct Bad {
                    #[openapi(inline)]
                    pub a: u32,
                }
            }),
            "expected `inline = \"...\"` or `embed`"
        );
    }
}

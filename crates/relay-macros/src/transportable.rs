//! `#[derive(Transportable)]` implementation.
//!
//! # Classification
//!
//! | Input | Generated `KIND` |
//! |-------|------------------|
//! | `struct A;`, `struct A {}`, `struct A();` | `TypeKind::Empty` |
//! | `enum E { X, Y }` | `TypeKind::Enum` |
//! | any other struct or enum | `TypeKind::Inspectable` |
//!
//! Inspectable types get `Self: Serialize + DeserializeOwned` in the impl's
//! where clause. For a non-generic type that lacks serde support the bound is
//! trivially false and the compiler rejects the derive itself.
//!
//! # Container attributes `#[transportable(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `crate` | `"relay::core"` | Path used instead of `::relay_core` |

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericParam, Path, parse_quote, spanned::Spanned,
};

/// The family reported by the generated impl.
enum Kind {
    Empty,
    Enum,
    Inspectable,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_transportable(input: &DeriveInput) -> syn::Result<TokenStream> {
    let krate = parse_crate_path(&input.attrs)?;
    let kind = classify(input)?;

    let name = &input.ident;
    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(#krate::Transportable));
        }
    }

    let where_clause = generics.make_where_clause();
    if matches!(kind, Kind::Inspectable) {
        where_clause.predicates.push(parse_quote!(
            Self: #krate::__private::Serialize + #krate::__private::DeserializeOwned
        ));
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let kind = match kind {
        Kind::Empty => quote!(#krate::TypeKind::Empty),
        Kind::Enum => quote!(#krate::TypeKind::Enum),
        Kind::Inspectable => quote!(#krate::TypeKind::Inspectable),
    };

    Ok(quote! {
        impl #impl_generics #krate::Transportable for #name #ty_generics #where_clause {
            const KIND: #krate::TypeKind = #kind;
        }
    })
}

fn classify(input: &DeriveInput) -> syn::Result<Kind> {
    match &input.data {
        Data::Struct(data) => Ok(if data.fields.is_empty() {
            Kind::Empty
        } else {
            Kind::Inspectable
        }),
        Data::Enum(data) => {
            let all_unit = data
                .variants
                .iter()
                .all(|variant| matches!(variant.fields, Fields::Unit));
            Ok(if all_unit && !data.variants.is_empty() {
                Kind::Enum
            } else {
                Kind::Inspectable
            })
        }
        Data::Union(_) => Err(syn::Error::new(
            input.span(),
            "Transportable cannot be derived for unions",
        )),
    }
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_crate_path(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut krate: Option<Path> = None;

    for attr in attrs {
        if !attr.path().is_ident("transportable") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                krate = Some(meta.value()?.parse::<syn::LitStr>()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown transportable attribute, expected `crate`"))
            }
        })?;
    }

    Ok(krate.unwrap_or_else(|| parse_quote!(::relay_core)))
}

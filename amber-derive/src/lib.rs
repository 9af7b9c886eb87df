use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod expand;

/// Attribute macro that derives all required traits for persisted types.
///
/// This is syntax sugar that expands to:
/// ```ignore
/// #[derive(Debug, Clone, Persist)]
/// ```
///
/// # Example
///
/// ```ignore
/// use amber_core::persistent;
///
/// #[persistent]
/// struct Settings {
///     name: String,
///     retries: u32,
/// }
/// ```
#[proc_macro_attribute]
pub fn persistent(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let output = quote! {
        #[derive(
            ::std::fmt::Debug,
            ::std::clone::Clone,
            ::amber_core::Persist
        )]
        #input
    };

    output.into()
}

/// Derive macro for the Persist trait.
///
/// Structs become records named after the type: named fields keep their
/// names, tuple fields are named `_0`, `_1`, ... Enums whose variants carry no
/// data become symbols named after the variant.
///
/// # Example
///
/// ```ignore
/// use amber_core::Persist;
///
/// #[derive(Persist)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[persist(skip)]` on a field - Leave the field out (field must impl Default)
/// - `#[persist(rename = "name")]` on a field or variant - Use a custom name
/// - `#[persist(rename = "name")]` on the type - Use a custom record name
/// - `#[persist(crate = "path")]` on the type - Path to `amber_core`
#[proc_macro_derive(Persist, attributes(persist))]
pub fn derive_persist(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_persist_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_persist_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let attrs = parse_container_attrs(&input.attrs)?;
    let crate_path = attrs.crate_path.clone().unwrap_or_else(|| syn::parse_quote!(::amber_core));
    let record_name = attrs.rename.unwrap_or_else(|| name.to_string());

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let where_clause = build_where_clause(generics, where_clause, &crate_path);

    let methods = match &input.data {
        syn::Data::Struct(data) => expand::record(name, &record_name, &data.fields, &crate_path)?,
        syn::Data::Enum(data) => expand::symbols(input, data, &crate_path)?,
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(input, "Persist cannot be derived for unions"));
        }
    };

    Ok(quote! {
        impl #impl_generics #crate_path::Persist for #name #ty_generics #where_clause {
            #methods
        }
    })
}

fn build_where_clause(
    generics: &syn::Generics,
    existing: Option<&syn::WhereClause>,
    crate_path: &syn::Path,
) -> proc_macro2::TokenStream {
    let type_params: Vec<_> = generics.type_params().map(|p| &p.ident).collect();

    if type_params.is_empty() && existing.is_none() {
        return quote! {};
    }

    let persist_bounds = type_params.iter().map(|p| {
        quote! { #p: #crate_path::Persist }
    });

    let existing_predicates = existing
        .map(|w| {
            let predicates = w.predicates.iter();
            quote! { #(#predicates,)* }
        })
        .unwrap_or_default();

    quote! {
        where
            #existing_predicates
            #(#persist_bounds),*
    }
}

#[derive(Default)]
struct ContainerAttrs {
    rename: Option<String>,
    crate_path: Option<syn::Path>,
}

fn parse_container_attrs(attrs: &[syn::Attribute]) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("persist") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("crate") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.crate_path = Some(value.parse()?);
            } else {
                return Err(meta.error("unsupported persist attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("persist") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else {
                return Err(meta.error("unsupported persist attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

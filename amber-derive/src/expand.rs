use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;

use crate::parse_field_attrs;

/// Generates `store` and `load` for a struct persisted as a record.
pub fn record(
    self_type: &syn::Ident,
    record_name: &str,
    fields: &syn::Fields,
    crate_path: &syn::Path,
) -> syn::Result<TokenStream> {
    let mut stores = Vec::new();
    let mut loads = Vec::new();

    for (i, field) in fields.iter().enumerate() {
        let attrs = parse_field_attrs(&field.attrs)?;
        let member = match &field.ident {
            Some(ident) => syn::Member::Named(ident.clone()),
            None => syn::Member::Unnamed(syn::Index::from(i)),
        };
        let key = attrs.rename.unwrap_or_else(|| match &field.ident {
            Some(ident) => ident.unraw().to_string(),
            None => format!("_{}", i),
        });

        if attrs.skip {
            loads.push(quote! { ::std::default::Default::default() });
            continue;
        }

        stores.push(quote! {
            (#key, #crate_path::Persist::store(&self.#member, graph))
        });
        loads.push(quote! {
            #crate_path::persist::field(graph, fields, #record_name, #key)?
        });
    }

    let construction = match fields {
        syn::Fields::Named(_) => {
            let idents = fields.iter().filter_map(|f| f.ident.as_ref());
            quote! { #self_type { #(#idents: #loads),* } }
        }
        syn::Fields::Unnamed(_) => quote! { #self_type(#(#loads),*) },
        syn::Fields::Unit => quote! { #self_type },
    };

    Ok(quote! {
        fn store(&self, graph: &mut #crate_path::Graph) -> #crate_path::NodeId {
            let fields: ::std::vec::Vec<(&'static str, #crate_path::NodeId)> =
                ::std::vec![#(#stores),*];
            graph.record(#record_name, fields)
        }

        fn load(
            graph: &#crate_path::Graph,
            id: #crate_path::NodeId,
        ) -> ::std::result::Result<Self, #crate_path::ConvertError> {
            #[allow(unused_variables)]
            let fields = #crate_path::persist::record_fields(graph, id, #record_name)?;
            ::std::result::Result::Ok(#construction)
        }
    })
}

/// Generates `store` and `load` for an enum persisted as a symbol.
pub fn symbols(
    input: &syn::DeriveInput,
    data: &syn::DataEnum,
    crate_path: &syn::Path,
) -> syn::Result<TokenStream> {
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "Persist cannot be derived for enums without variants",
        ));
    }

    let mut stores = Vec::new();
    let mut loads = Vec::new();

    for variant in &data.variants {
        if !matches!(variant.fields, syn::Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Persist can only be derived for enums whose variants carry no data",
            ));
        }

        let attrs = parse_field_attrs(&variant.attrs)?;
        if attrs.skip {
            return Err(syn::Error::new_spanned(variant, "enum variants cannot be skipped"));
        }
        let ident = &variant.ident;
        let name = attrs.rename.unwrap_or_else(|| ident.unraw().to_string());

        stores.push(quote! { Self::#ident => graph.symbol(#name) });
        loads.push(quote! { #name => ::std::result::Result::Ok(Self::#ident) });
    }

    Ok(quote! {
        fn store(&self, graph: &mut #crate_path::Graph) -> #crate_path::NodeId {
            match self {
                #(#stores),*
            }
        }

        fn load(
            graph: &#crate_path::Graph,
            id: #crate_path::NodeId,
        ) -> ::std::result::Result<Self, #crate_path::ConvertError> {
            match #crate_path::persist::symbol(graph, id)? {
                #(#loads,)*
                other => ::std::result::Result::Err(
                    #crate_path::ConvertError::UnknownVariant(other.to_string()),
                ),
            }
        }
    })
}

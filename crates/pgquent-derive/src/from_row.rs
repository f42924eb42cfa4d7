//! FromRow derive macro implementation

use crate::attrs::{FieldAttr, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = named_fields(&input, "FromRow")?;
    let mut field_extracts = Vec::with_capacity(fields.len());
    for field in fields {
        let field_name = &field.ident;
        let attr = FieldAttr::from_field(field)?;
        let extract = if attr.skip {
            quote! { ::std::default::Default::default() }
        } else if attr.meta {
            quote! { <pgquent::Timestamps as pgquent::FromRow>::from_row(row)? }
        } else {
            let column_name = attr.column_name(field)?;
            quote! { row.try_get_column(#column_name)? }
        };
        field_extracts.push(quote! { #field_name: #extract });
    }

    Ok(quote! {
        impl #impl_generics pgquent::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &pgquent::tokio_postgres::Row) -> pgquent::OrmResult<Self> {
                use pgquent::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

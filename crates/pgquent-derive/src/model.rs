//! Model derive macro implementation

use crate::attrs::{FieldAttr, StructAttr, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::{DeriveInput, Error, Result};

/// A persisted field and its column.
struct ColumnField {
    ident: syn::Ident,
    column: String,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attr = StructAttr::from_input(&input)?;
    let table = attr.table_name(&input)?;
    if attr.auto_increment && attr.uuid {
        return Err(Error::new_spanned(
            &input,
            "`auto_increment` and `uuid` are mutually exclusive",
        ));
    }

    let fields = named_fields(&input, "Model")?;
    let mut columns: Vec<ColumnField> = Vec::with_capacity(fields.len());
    let mut seen = HashSet::new();
    let mut primary_key: Option<String> = None;
    let mut meta_field: Option<syn::Ident> = None;

    for field in fields {
        let field_attr = FieldAttr::from_field(field)?;
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if field_attr.skip {
            continue;
        }
        if field_attr.meta {
            if meta_field.is_some() {
                return Err(Error::new_spanned(field, "only one #[orm(meta)] field is allowed"));
            }
            meta_field = Some(ident);
            continue;
        }

        let column = field_attr.column_name(field)?;
        if !seen.insert(column.clone()) {
            return Err(Error::new_spanned(
                field,
                format!("duplicate column '{column}'"),
            ));
        }
        if field_attr.is_id {
            if primary_key.is_some() {
                return Err(Error::new_spanned(field, "only one #[orm(id)] field is allowed"));
            }
            primary_key = Some(column.clone());
        }
        columns.push(ColumnField { ident, column });
    }

    let primary_key = match primary_key {
        Some(pk) => pk,
        None if seen.contains("id") => "id".to_string(),
        None => {
            return Err(Error::new_spanned(
                &input,
                "Model needs a primary key: mark a field with #[orm(id)] or name it `id`",
            ));
        }
    };

    if (attr.timestamps || attr.soft_delete) && meta_field.is_none() {
        return Err(Error::new_spanned(
            &input,
            "`timestamps` and `soft_delete` need a `Timestamps` field marked #[orm(meta)]",
        ));
    }
    for reserved in ["created_at", "updated_at", "deleted_at"] {
        if seen.contains(reserved) && (attr.timestamps || attr.soft_delete) {
            return Err(Error::new_spanned(
                &input,
                format!("column '{reserved}' is managed through the #[orm(meta)] field"),
            ));
        }
    }

    let column_names: Vec<&str> = columns.iter().map(|c| c.column.as_str()).collect();
    let payload_inserts = columns.iter().map(|c| {
        let ident = &c.ident;
        let column = &c.column;
        quote! { params.insert(#column, ::std::clone::Clone::clone(&self.#ident)); }
    });
    let merge_fields = columns.iter().map(|c| {
        let ident = &c.ident;
        let column = &c.column;
        quote! {
            if row.has_column(#column) {
                self.#ident = row.try_get_column(#column)?;
            }
        }
    });

    let auto_increment = attr.auto_increment;
    let uuid = attr.uuid;
    let timestamps = attr.timestamps;
    let soft_delete = attr.soft_delete;

    let (meta_payload, meta_merge, meta_accessors) = match &meta_field {
        Some(meta) => (
            quote! { self.#meta.write_payload(&<Self as pgquent::Model>::META, &mut params); },
            quote! { self.#meta.merge_row(row)?; },
            quote! {
                fn timestamps(&self) -> ::std::option::Option<&pgquent::Timestamps> {
                    ::std::option::Option::Some(&self.#meta)
                }

                fn timestamps_mut(&mut self) -> ::std::option::Option<&mut pgquent::Timestamps> {
                    ::std::option::Option::Some(&mut self.#meta)
                }
            },
        ),
        None => (quote! {}, quote! {}, quote! {}),
    };

    Ok(quote! {
        impl #impl_generics pgquent::Model for #name #ty_generics #where_clause {
            const META: pgquent::ModelMeta = pgquent::ModelMeta {
                table: #table,
                primary_key: #primary_key,
                columns: &[#(#column_names),*],
                auto_increment: #auto_increment,
                uuid: #uuid,
                timestamps: #timestamps,
                soft_delete: #soft_delete,
            };

            fn payload(&self) -> pgquent::Params {
                let mut params = pgquent::Params::new();
                #(#payload_inserts)*
                #meta_payload
                params
            }

            fn merge_row(&mut self, row: &pgquent::tokio_postgres::Row) -> pgquent::OrmResult<()> {
                use pgquent::RowExt;
                #(#merge_fields)*
                #meta_merge
                Ok(())
            }

            #meta_accessors
        }
    })
}

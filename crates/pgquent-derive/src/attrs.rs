//! `#[orm(...)]` attribute parsing shared by both derives.

use crate::sql_ident::parse_sql_ident_with_span;
use heck::ToSnakeCase;
use syn::{Attribute, DeriveInput, Error, LitStr, Result};

/// Struct-level attributes.
#[derive(Default)]
pub(crate) struct StructAttr {
    pub table: Option<LitStr>,
    pub auto_increment: bool,
    pub uuid: bool,
    pub timestamps: bool,
    pub soft_delete: bool,
}

/// Field-level attributes.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub column: Option<LitStr>,
    pub meta: bool,
    pub skip: bool,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = StructAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "table" {
                let _: syn::Token![=] = input.parse()?;
                attr.table = Some(input.parse()?);
            } else if ident == "auto_increment" {
                attr.auto_increment = true;
            } else if ident == "uuid" {
                attr.uuid = true;
            } else if ident == "timestamps" {
                attr.timestamps = true;
            } else if ident == "soft_delete" {
                attr.soft_delete = true;
            } else {
                return Err(Error::new(
                    ident.span(),
                    format!("unknown orm attribute `{ident}`"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "meta" {
                attr.meta = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                attr.column = Some(input.parse()?);
            } else {
                return Err(Error::new(
                    ident.span(),
                    format!("unknown orm field attribute `{ident}`"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

fn orm_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident("orm"))
}

impl StructAttr {
    /// Merge every `#[orm(...)]` on the struct.
    pub fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut merged = StructAttr::default();
        for attr in orm_attrs(&input.attrs) {
            let parsed: StructAttr = attr.parse_args()?;
            if parsed.table.is_some() {
                merged.table = parsed.table;
            }
            merged.auto_increment |= parsed.auto_increment;
            merged.uuid |= parsed.uuid;
            merged.timestamps |= parsed.timestamps;
            merged.soft_delete |= parsed.soft_delete;
        }
        Ok(merged)
    }

    /// Declared table name, or the snake_case struct name.
    pub fn table_name(&self, input: &DeriveInput) -> Result<String> {
        match &self.table {
            Some(lit) => parse_sql_ident_with_span(&lit.value(), lit.span(), "table name"),
            None => parse_sql_ident_with_span(
                &input.ident.to_string().to_snake_case(),
                input.ident.span(),
                "table name",
            ),
        }
    }
}

impl FieldAttr {
    pub fn from_field(field: &syn::Field) -> Result<Self> {
        let mut merged = FieldAttr::default();
        for attr in orm_attrs(&field.attrs) {
            let parsed: FieldAttr = attr.parse_args()?;
            merged.is_id |= parsed.is_id;
            merged.meta |= parsed.meta;
            merged.skip |= parsed.skip;
            if parsed.column.is_some() {
                merged.column = parsed.column;
            }
        }
        if merged.meta && (merged.is_id || merged.column.is_some()) {
            return Err(Error::new_spanned(
                field,
                "#[orm(meta)] cannot be combined with `id` or `column`",
            ));
        }
        Ok(merged)
    }

    /// Declared column name, or the field name.
    pub fn column_name(&self, field: &syn::Field) -> Result<String> {
        match &self.column {
            Some(lit) => parse_sql_ident_with_span(&lit.value(), lit.span(), "column name"),
            None => {
                let ident = field
                    .ident
                    .as_ref()
                    .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
                let name = ident.to_string();
                let name = name.strip_prefix("r#").unwrap_or(&name);
                parse_sql_ident_with_span(name, ident.span(), "column name")
            }
        }
    }
}

/// Named fields of a struct, or an error naming the derive.
pub(crate) fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(fields) => Ok(&fields.named),
            _ => Err(Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

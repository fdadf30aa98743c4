//! Walks the annotated struct, calls into `pebble_core::tag` to parse every
//! `#[po(...)]` attribute and `table_name:`/`index:` doc directive, resolves
//! relationship target types from the field's own Rust type, and assembles
//! the `TableMetadata` this struct describes. `codegen`/`relations` turn the
//! result into tokens.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, GenericArgument, Ident, PathArguments, Result, Type};

use pebble_core::schema::{ForeignKeyMetadata, PrimaryKey, TableMetadata};
use pebble_core::tag::{self, TagResult, TableDirective};

use crate::codegen::{self, ColumnField, RelationField};
use crate::relations;

/// Extracts the string literal inside `#[po("...")]`.
fn po_attr(attrs: &[syn::Attribute]) -> Option<String> {
    attrs.iter().find_map(|attr| {
        if !attr.path().is_ident("po") {
            return None;
        }
        attr.parse_args::<syn::LitStr>().ok().map(|lit| lit.value())
    })
}

/// Collects `#[doc = "..."]` lines (the textual form of `///` comments) in
/// declaration order, trimmed of their leading space.
fn doc_comment_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Strips `Vec<_>`/`Option<_>`/`Box<_>` wrappers to find the relationship
/// target's element type, e.g. `Vec<Post>` / `Option<Client>` → `Client`.
fn innermost_type(ty: &Type) -> &Type {
    if let Type::Path(type_path) = ty {
        if let Some(seg) = type_path.path.segments.last() {
            if matches!(seg.ident.to_string().as_str(), "Vec" | "Option" | "Box") {
                if let PathArguments::AngleBracketed(args) = &seg.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return innermost_type(inner);
                    }
                }
            }
        }
    }
    ty
}

fn type_ident(ty: &Type) -> Option<&Ident> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|seg| &seg.ident),
        _ => None,
    }
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let ident = input.ident.clone();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new_spanned(
                    &input,
                    "Table can only be derived for structs with named fields",
                ))
            }
        },
        _ => return Err(Error::new_spanned(&input, "Table can only be derived for structs")),
    };

    let mut table_name = ident.to_string().to_snake_case();
    let mut directive_indexes = Vec::new();

    for line in doc_comment_lines(&input.attrs) {
        let directive = tag::parse_table_directive(&table_name, &line)
            .map_err(|e| Error::new_spanned(&input, e.to_string()))?;
        match directive {
            Some(TableDirective::TableName(name)) => table_name = name,
            Some(TableDirective::Index(idx)) => directive_indexes.push(idx),
            None => {}
        }
    }

    let mut column_fields: Vec<ColumnField> = Vec::new();
    let mut relation_fields: Vec<RelationField> = Vec::new();
    let mut indexes = Vec::new();
    let mut enum_types = Vec::new();

    for field in fields {
        let field_ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "Table fields must be named"))?;
        let go_field = field_ident.to_string();
        let tag = po_attr(&field.attrs)
            .ok_or_else(|| Error::new_spanned(field, "field is missing a #[po(\"...\")] attribute"))?;

        let result = tag::parse_field_tag(&table_name, &go_field, &tag)
            .map_err(|e| Error::new_spanned(field, e.to_string()))?;

        match result {
            TagResult::Column { column, indexes: col_indexes } => {
                if let Some(values) = tag::parse_enum_values(&tag) {
                    let enum_name = format!("{table_name}_{}", column.name);
                    if !enum_types.iter().any(|e: &pebble_core::schema::EnumType| e.name == enum_name) {
                        enum_types.push(pebble_core::schema::EnumType { name: enum_name, values });
                    }
                }
                indexes.extend(col_indexes);
                column_fields.push(ColumnField {
                    ident: field_ident,
                    ty: field.ty.clone(),
                    column,
                });
            }
            TagResult::Relationship(mut rel) => {
                let target_ty = innermost_type(&field.ty);
                let target_ident = type_ident(target_ty).ok_or_else(|| {
                    Error::new_spanned(field, "could not resolve relationship target type")
                })?;
                rel.target_type = target_ident.to_string();
                rel.target_table = target_ident.to_string().to_snake_case();
                relation_fields.push(RelationField {
                    ident: field_ident,
                    ty: field.ty.clone(),
                    rel,
                });
            }
        }
    }

    indexes.extend(directive_indexes);

    let pk_columns: Vec<String> = column_fields
        .iter()
        .filter(|c| c.column.is_primary_key)
        .map(|c| c.column.name.clone())
        .collect();
    let primary_key = if pk_columns.is_empty() {
        None
    } else {
        Some(PrimaryKey {
            name: format!("pk_{table_name}"),
            columns: pk_columns,
        })
    };

    let foreign_keys: Vec<ForeignKeyMetadata> = column_fields
        .iter()
        .filter_map(|c| {
            c.column.foreign_key.as_ref().map(|fk| ForeignKeyMetadata {
                name: format!("fk_{table_name}_{}", c.column.name),
                columns: vec![c.column.name.clone()],
                target_table: fk.target_table.clone(),
                target_columns: vec![fk.target_column.clone()],
                on_delete: fk.on_delete,
                on_update: fk.on_update,
            })
        })
        .collect();

    let metadata = TableMetadata {
        name: table_name.clone(),
        schema: "public".to_string(),
        go_type: Some(ident.to_string()),
        columns: column_fields.iter().map(|c| c.column.clone()).collect(),
        primary_key,
        indexes,
        foreign_keys,
        relationships: relation_fields.iter().map(|r| r.rel.clone()).collect(),
        enum_types,
    };

    let metadata_tokens = codegen::quote_table_metadata(&metadata);
    let from_row_tokens = codegen::quote_from_row(&ident, &column_fields, &relation_fields);
    let to_row_tokens = codegen::quote_to_row(&column_fields);
    let relations_tokens =
        relations::quote_has_relations(&ident, &table_name, &relation_fields, &column_fields);

    Ok(quote! {
        impl ::pebble_core::registry::Table for #ident {
            fn table_metadata() -> ::pebble_core::schema::TableMetadata {
                #metadata_tokens
            }
        }

        impl ::pebble_core::scanner::FromRow for #ident {
            fn from_row(src: &dyn ::pebble_core::scanner::ColumnSource) -> ::pebble_core::error::Result<Self> {
                #from_row_tokens
            }
        }

        impl ::pebble_core::scanner::ToRow for #ident {
            fn to_fields(&self) -> ::std::vec::Vec<::pebble_core::scanner::FieldValue> {
                #to_row_tokens
            }
        }

        #relations_tokens
    })
}

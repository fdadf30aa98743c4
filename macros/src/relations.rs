//! Generates the `HasRelations`/`RelationLoader<Base>` impls (C10, spec.md
//! §4.7) for one base record type: a small loader struct per relationship
//! field, dispatched by field name.
//!
//! belongsTo/hasOne/hasMany issue a single batched `ANY($1)` query against
//! the target table; manyToMany issues a junction-table query first, then a
//! target-table query on the resolved ids, joining the two in memory (spec.md
//! §4.7 step: "issue two queries ... then join in memory").

use heck::ToUpperCamelCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

use pebble_core::schema::RelationshipType;

use crate::codegen::{self, ColumnField, RelationField};

fn find_column<'a>(columns: &'a [ColumnField], name: &str) -> Option<&'a ColumnField> {
    columns.iter().find(|c| c.column.name == name)
}

fn loader_ident(base: &Ident, field: &Ident) -> Ident {
    format_ident!("{}{}RelationLoader", base, field.to_string().to_upper_camel_case())
}

/// Emits one `RelationLoader<Base>` impl. `local` is the column on `Base`
/// whose value keys the batched lookup; `remote_column` is the matching
/// column name in the row returned by the batched query.
fn quote_loader(
    base: &Ident,
    table_name: &str,
    field: &RelationField,
    columns: &[ColumnField],
) -> syn::Result<TokenStream> {
    let struct_ident = loader_ident(base, &field.ident);
    let field_ident = &field.ident;
    let target_ident = format_ident!("{}", field.rel.target_type);
    let target_table = &field.rel.target_table;
    let metadata_tokens = codegen::quote_relationship(&field.rel);

    let body = match field.rel.kind {
        RelationshipType::BelongsTo => {
            let fk_name = if field.rel.foreign_key.is_empty() {
                format!("{}_id", field.rel.target_table)
            } else {
                field.rel.foreign_key.clone()
            };
            let local = find_column(columns, &fk_name).ok_or_else(|| {
                syn::Error::new(
                    proc_macro2::Span::call_site(),
                    format!("belongsTo relation '{}' needs a column named '{fk_name}' on the base struct", field.rel.source_field),
                )
            })?;
            let local_ident = &local.ident;
            let remote_column = &field.rel.references;
            quote! {
                let keys: ::std::vec::Vec<::pebble_core::value::SqlValue> = bases
                    .iter()
                    .map(|b| b.#local_ident.clone().into())
                    .collect();
                let stmt = ::pebble_core::preload::batched_select_by_any(#target_table, #remote_column, keys);
                let rendered = stmt.render();
                let rows = executor.query(&rendered.sql, &rendered.args).await?;
                let mut children: ::std::vec::Vec<#target_ident> = ::std::vec::Vec::with_capacity(rows.len());
                for row in &rows {
                    children.push(<#target_ident as ::pebble_core::scanner::FromRow>::from_row(row.as_ref())?);
                }
                if !rest.is_empty() {
                    let rest_refs: ::std::vec::Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
                    ::pebble_core::preload::preload_paths(&mut children, &rest_refs, executor).await?;
                }
                let mut by_key: ::std::collections::HashMap<::std::string::String, #target_ident> = ::std::collections::HashMap::new();
                for (row, child) in rows.iter().zip(children.into_iter()) {
                    if let ::std::option::Option::Some(idx) = row.index_of(#remote_column) {
                        let key = ::pebble_core::preload::sql_value_key(&row.value(idx)?);
                        by_key.entry(key).or_insert(child);
                    }
                }
                for base in bases.iter_mut() {
                    let key = ::pebble_core::preload::sql_value_key(&base.#local_ident.clone().into());
                    base.#field_ident = by_key.get(&key).cloned();
                }
            }
        }
        RelationshipType::HasOne | RelationshipType::HasMany => {
            let local = find_column(columns, &field.rel.references).ok_or_else(|| {
                syn::Error::new(
                    proc_macro2::Span::call_site(),
                    format!("relation '{}' needs a column named '{}' on the base struct", field.rel.source_field, field.rel.references),
                )
            })?;
            let local_ident = &local.ident;
            let fk_name = if field.rel.foreign_key.is_empty() {
                format!("{table_name}_id")
            } else {
                field.rel.foreign_key.clone()
            };
            let assign = if matches!(field.rel.kind, RelationshipType::HasMany) {
                quote! {
                    base.#field_ident = by_key.remove(&key).unwrap_or_default();
                }
            } else {
                quote! {
                    base.#field_ident = by_key.remove(&key).and_then(|mut v| v.pop());
                }
            };
            quote! {
                let keys: ::std::vec::Vec<::pebble_core::value::SqlValue> = bases
                    .iter()
                    .map(|b| b.#local_ident.clone().into())
                    .collect();
                let stmt = ::pebble_core::preload::batched_select_by_any(#target_table, #fk_name, keys);
                let rendered = stmt.render();
                let rows = executor.query(&rendered.sql, &rendered.args).await?;
                let mut children: ::std::vec::Vec<#target_ident> = ::std::vec::Vec::with_capacity(rows.len());
                for row in &rows {
                    children.push(<#target_ident as ::pebble_core::scanner::FromRow>::from_row(row.as_ref())?);
                }
                if !rest.is_empty() {
                    let rest_refs: ::std::vec::Vec<&str> = rest.iter().map(|s| s.as_str()).collect();
                    ::pebble_core::preload::preload_paths(&mut children, &rest_refs, executor).await?;
                }
                let mut by_key: ::std::collections::HashMap<::std::string::String, ::std::vec::Vec<#target_ident>> = ::std::collections::HashMap::new();
                for (row, child) in rows.iter().zip(children.into_iter()) {
                    if let ::std::option::Option::Some(idx) = row.index_of(#fk_name) {
                        let key = ::pebble_core::preload::sql_value_key(&row.value(idx)?);
                        by_key.entry(key).or_default().push(child);
                    }
                }
                for base in bases.iter_mut() {
                    let key = ::pebble_core::preload::sql_value_key(&base.#local_ident.clone().into());
                    #assign
                }
            }
        }
        RelationshipType::ManyToMany => {
            let join_table = field.rel.join_table.clone().ok_or_else(|| {
                syn::Error::new(
                    proc_macro2::Span::call_site(),
                    format!("manyToMany relation '{}' requires joinTable=", field.rel.source_field),
                )
            })?;
            let local = find_column(columns, &field.rel.references).ok_or_else(|| {
                syn::Error::new(
                    proc_macro2::Span::call_site(),
                    format!("relation '{}' needs a column named '{}' on the base struct", field.rel.source_field, field.rel.references),
                )
            })?;
            let local_ident = &local.ident;
            let base_junction_col = if field.rel.foreign_key.is_empty() {
                format!("{table_name}_id")
            } else {
                field.rel.foreign_key.clone()
            };
            let target_junction_col = format!("{}_id", field.rel.target_table);
            quote! {
                let keys: ::std::vec::Vec<::pebble_core::value::SqlValue> = bases
                    .iter()
                    .map(|b| b.#local_ident.clone().into())
                    .collect();
                let join_stmt = ::pebble_core::preload::batched_select_by_any(#join_table, #base_junction_col, keys);
                let join_rendered = join_stmt.render();
                let join_rows = executor.query(&join_rendered.sql, &join_rendered.args).await?;

                let mut target_keys: ::std::vec::Vec<::pebble_core::value::SqlValue> = ::std::vec::Vec::new();
                let mut base_to_targets: ::std::collections::HashMap<::std::string::String, ::std::vec::Vec<::std::string::String>> = ::std::collections::HashMap::new();
                for row in &join_rows {
                    let base_idx = row.index_of(#base_junction_col);
                    let target_idx = row.index_of(#target_junction_col);
                    if let (::std::option::Option::Some(b), ::std::option::Option::Some(t)) = (base_idx, target_idx) {
                        let base_value = row.value(b)?;
                        let target_value = row.value(t)?;
                        let base_key = ::pebble_core::preload::sql_value_key(&base_value);
                        let target_key = ::pebble_core::preload::sql_value_key(&target_value);
                        base_to_targets.entry(base_key).or_default().push(target_key);
                        target_keys.push(target_value);
                    }
                }

                let target_stmt = ::pebble_core::preload::batched_select_by_any(#target_table, "id", target_keys);
                let target_rendered = target_stmt.render();
                let target_rows = executor.query(&target_rendered.sql, &target_rendered.args).await?;
                let mut children: ::std::vec::Vec<#target_ident> = ::std::vec::Vec::with_capacity(target_rows.len());
                for row in &target_rows {
                    children.push(<#target_ident as ::pebble_core::scanner::FromRow>::from_row(row.as_ref())?);
                }
                if !rest.is_empty() {
                    return ::std::result::Result::Err(::pebble_core::error::Error::metadata(
                        "nested preload paths are not supported through a manyToMany relationship",
                    ));
                }

                let mut by_target_key: ::std::collections::HashMap<::std::string::String, #target_ident> = ::std::collections::HashMap::new();
                for (row, child) in target_rows.iter().zip(children.into_iter()) {
                    if let ::std::option::Option::Some(idx) = row.index_of("id") {
                        let key = ::pebble_core::preload::sql_value_key(&row.value(idx)?);
                        by_target_key.entry(key).or_insert(child);
                    }
                }

                for base in bases.iter_mut() {
                    let base_key = ::pebble_core::preload::sql_value_key(&base.#local_ident.clone().into());
                    base.#field_ident = base_to_targets
                        .get(&base_key)
                        .map(|target_keys| {
                            target_keys
                                .iter()
                                .filter_map(|k| by_target_key.get(k).cloned())
                                .collect()
                        })
                        .unwrap_or_default();
                }
            }
        }
    };

    Ok(quote! {
        #[doc(hidden)]
        struct #struct_ident;

        impl #struct_ident {
            fn new() -> Self {
                Self
            }
        }

        #[::pebble_core::__private::async_trait::async_trait]
        impl ::pebble_core::preload::RelationLoader<#base> for #struct_ident {
            fn metadata(&self) -> &::pebble_core::schema::RelationshipMetadata {
                static META: ::pebble_core::__private::once_cell::sync::Lazy<::pebble_core::schema::RelationshipMetadata> =
                    ::pebble_core::__private::once_cell::sync::Lazy::new(|| #metadata_tokens);
                &META
            }

            async fn load(
                &self,
                bases: &mut [#base],
                rest: &[::std::string::String],
                executor: &dyn ::pebble_core::driver::Executor,
            ) -> ::pebble_core::error::Result<()> {
                #body
                ::std::result::Result::Ok(())
            }
        }
    })
}

pub fn quote_has_relations(
    base: &Ident,
    table_name: &str,
    relations: &[RelationField],
    columns: &[ColumnField],
) -> TokenStream {
    if relations.is_empty() {
        return quote! {
            impl ::pebble_core::preload::HasRelations for #base {
                fn relation_loader(
                    _name: &str,
                ) -> ::std::option::Option<::std::boxed::Box<dyn ::pebble_core::preload::RelationLoader<Self>>> {
                    ::std::option::Option::None
                }
            }
        };
    }

    let loaders: Vec<TokenStream> = match relations
        .iter()
        .map(|r| quote_loader(base, table_name, r, columns))
        .collect::<syn::Result<Vec<_>>>()
    {
        Ok(loaders) => loaders,
        Err(err) => return err.to_compile_error(),
    };

    let arms = relations.iter().map(|r| {
        let source_field = &r.rel.source_field;
        let struct_ident = loader_ident(base, &r.ident);
        quote! {
            #source_field => ::std::option::Option::Some(::std::boxed::Box::new(#struct_ident::new())),
        }
    });

    quote! {
        #(#loaders)*

        impl ::pebble_core::preload::HasRelations for #base {
            fn relation_loader(
                name: &str,
            ) -> ::std::option::Option<::std::boxed::Box<dyn ::pebble_core::preload::RelationLoader<Self>>> {
                match name {
                    #(#arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    }
}

//! Quotes already-parsed `pebble_core::schema` values back out as literal
//! Rust constructor expressions, plus the `FromRow`/`ToRow` method bodies.
//!
//! The derive macro does the real parsing at expansion time by calling
//! straight into `pebble_core::tag` (the same parser the AST-registration
//! path uses, spec.md §9) — this module's only job is serializing the
//! resulting structs into tokens so the generated `table_metadata()` just
//! rebuilds the identical value at the consuming crate's runtime.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

use pebble_core::schema::{
    ColumnForeignKey, ColumnMetadata, EnumType, ForeignKeyMetadata, Generated, Identity,
    IdentityGeneration, IndexColumn, IndexMetadata, IndexType, NullsPosition, PrimaryKey,
    ReferentialAction, RelationshipMetadata, RelationshipType, SortDirection, TableMetadata,
};

pub struct ColumnField {
    pub ident: Ident,
    pub ty: syn::Type,
    pub column: ColumnMetadata,
}

pub struct RelationField {
    pub ident: Ident,
    pub ty: syn::Type,
    pub rel: RelationshipMetadata,
}

fn opt_string(o: &Option<String>) -> TokenStream {
    match o {
        Some(s) => quote! { ::std::option::Option::Some(#s.to_string()) },
        None => quote! { ::std::option::Option::None },
    }
}

fn strings(v: &[String]) -> TokenStream {
    let items = v.iter().map(|s| quote! { #s.to_string() });
    quote! { ::std::vec![ #(#items),* ] }
}

fn quote_referential_action(action: ReferentialAction) -> TokenStream {
    match action {
        ReferentialAction::NoAction => quote! { ::pebble_core::schema::ReferentialAction::NoAction },
        ReferentialAction::Restrict => quote! { ::pebble_core::schema::ReferentialAction::Restrict },
        ReferentialAction::Cascade => quote! { ::pebble_core::schema::ReferentialAction::Cascade },
        ReferentialAction::SetNull => quote! { ::pebble_core::schema::ReferentialAction::SetNull },
        ReferentialAction::SetDefault => quote! { ::pebble_core::schema::ReferentialAction::SetDefault },
    }
}

fn quote_identity_generation(gen: IdentityGeneration) -> TokenStream {
    match gen {
        IdentityGeneration::Always => quote! { ::pebble_core::schema::IdentityGeneration::Always },
        IdentityGeneration::ByDefault => quote! { ::pebble_core::schema::IdentityGeneration::ByDefault },
    }
}

fn quote_index_type(ty: IndexType) -> TokenStream {
    match ty {
        IndexType::Btree => quote! { ::pebble_core::schema::IndexType::Btree },
        IndexType::Gin => quote! { ::pebble_core::schema::IndexType::Gin },
        IndexType::Gist => quote! { ::pebble_core::schema::IndexType::Gist },
        IndexType::Brin => quote! { ::pebble_core::schema::IndexType::Brin },
        IndexType::Hash => quote! { ::pebble_core::schema::IndexType::Hash },
    }
}

fn quote_sort_direction(dir: SortDirection) -> TokenStream {
    match dir {
        SortDirection::Asc => quote! { ::pebble_core::schema::SortDirection::Asc },
        SortDirection::Desc => quote! { ::pebble_core::schema::SortDirection::Desc },
    }
}

fn quote_nulls_position(pos: NullsPosition) -> TokenStream {
    match pos {
        NullsPosition::First => quote! { ::pebble_core::schema::NullsPosition::First },
        NullsPosition::Last => quote! { ::pebble_core::schema::NullsPosition::Last },
        NullsPosition::Default => quote! { ::pebble_core::schema::NullsPosition::Default },
    }
}

fn quote_relationship_type(kind: RelationshipType) -> TokenStream {
    match kind {
        RelationshipType::BelongsTo => quote! { ::pebble_core::schema::RelationshipType::BelongsTo },
        RelationshipType::HasOne => quote! { ::pebble_core::schema::RelationshipType::HasOne },
        RelationshipType::HasMany => quote! { ::pebble_core::schema::RelationshipType::HasMany },
        RelationshipType::ManyToMany => quote! { ::pebble_core::schema::RelationshipType::ManyToMany },
    }
}

fn quote_foreign_key(fk: &ColumnForeignKey) -> TokenStream {
    let target_table = &fk.target_table;
    let target_column = &fk.target_column;
    let on_delete = quote_referential_action(fk.on_delete);
    let on_update = quote_referential_action(fk.on_update);
    quote! {
        ::pebble_core::schema::ColumnForeignKey {
            target_table: #target_table.to_string(),
            target_column: #target_column.to_string(),
            on_delete: #on_delete,
            on_update: #on_update,
        }
    }
}

fn quote_identity(identity: &Identity) -> TokenStream {
    let generation = quote_identity_generation(identity.generation);
    quote! { ::pebble_core::schema::Identity { generation: #generation } }
}

fn quote_generated(generated: &Generated) -> TokenStream {
    let expression = &generated.expression;
    let stored = generated.stored;
    quote! {
        ::pebble_core::schema::Generated {
            expression: #expression.to_string(),
            stored: #stored,
        }
    }
}

fn quote_column(column: &ColumnMetadata) -> TokenStream {
    let name = &column.name;
    let go_field = &column.go_field;
    let sql_type = &column.sql_type;
    let nullable = column.nullable;
    let unique = column.unique;
    let default = opt_string(&column.default);
    let auto_increment = column.auto_increment;
    let is_primary_key = column.is_primary_key;
    let is_jsonb = column.is_jsonb;
    let identity = match &column.identity {
        Some(i) => {
            let inner = quote_identity(i);
            quote! { ::std::option::Option::Some(#inner) }
        }
        None => quote! { ::std::option::Option::None },
    };
    let generated = match &column.generated {
        Some(g) => {
            let inner = quote_generated(g);
            quote! { ::std::option::Option::Some(#inner) }
        }
        None => quote! { ::std::option::Option::None },
    };
    let collation = opt_string(&column.collation);
    let operator_class = opt_string(&column.operator_class);
    let foreign_key = match &column.foreign_key {
        Some(fk) => {
            let inner = quote_foreign_key(fk);
            quote! { ::std::option::Option::Some(#inner) }
        }
        None => quote! { ::std::option::Option::None },
    };
    let check = opt_string(&column.check);

    quote! {
        ::pebble_core::schema::ColumnMetadata {
            name: #name.to_string(),
            go_field: #go_field.to_string(),
            sql_type: #sql_type.to_string(),
            nullable: #nullable,
            unique: #unique,
            default: #default,
            auto_increment: #auto_increment,
            is_primary_key: #is_primary_key,
            is_jsonb: #is_jsonb,
            identity: #identity,
            generated: #generated,
            collation: #collation,
            operator_class: #operator_class,
            foreign_key: #foreign_key,
            check: #check,
        }
    }
}

fn quote_index_column(col: &IndexColumn) -> TokenStream {
    let expression = &col.expression;
    let direction = quote_sort_direction(col.direction);
    let nulls = quote_nulls_position(col.nulls);
    let operator_class = opt_string(&col.operator_class);
    quote! {
        ::pebble_core::schema::IndexColumn {
            expression: #expression.to_string(),
            direction: #direction,
            nulls: #nulls,
            operator_class: #operator_class,
        }
    }
}

fn quote_index(index: &IndexMetadata) -> TokenStream {
    let name = &index.name;
    let columns = index.columns.iter().map(quote_index_column);
    let include = strings(&index.include);
    let r#where = opt_string(&index.r#where);
    let index_type = quote_index_type(index.index_type);
    let unique = index.unique;
    let concurrent = index.concurrent;
    quote! {
        ::pebble_core::schema::IndexMetadata {
            name: #name.to_string(),
            columns: ::std::vec![ #(#columns),* ],
            include: #include,
            r#where: #r#where,
            index_type: #index_type,
            unique: #unique,
            concurrent: #concurrent,
        }
    }
}

fn quote_foreign_key_metadata(fk: &ForeignKeyMetadata) -> TokenStream {
    let name = &fk.name;
    let columns = strings(&fk.columns);
    let target_table = &fk.target_table;
    let target_columns = strings(&fk.target_columns);
    let on_delete = quote_referential_action(fk.on_delete);
    let on_update = quote_referential_action(fk.on_update);
    quote! {
        ::pebble_core::schema::ForeignKeyMetadata {
            name: #name.to_string(),
            columns: #columns,
            target_table: #target_table.to_string(),
            target_columns: #target_columns,
            on_delete: #on_delete,
            on_update: #on_update,
        }
    }
}

pub(crate) fn quote_relationship(rel: &RelationshipMetadata) -> TokenStream {
    let source_field = &rel.source_field;
    let kind = quote_relationship_type(rel.kind);
    let target_type = &rel.target_type;
    let target_table = &rel.target_table;
    let foreign_key = &rel.foreign_key;
    let references = &rel.references;
    let join_table = opt_string(&rel.join_table);
    quote! {
        ::pebble_core::schema::RelationshipMetadata {
            source_field: #source_field.to_string(),
            kind: #kind,
            target_type: #target_type.to_string(),
            target_table: #target_table.to_string(),
            foreign_key: #foreign_key.to_string(),
            references: #references.to_string(),
            join_table: #join_table,
        }
    }
}

fn quote_enum_type(e: &EnumType) -> TokenStream {
    let name = &e.name;
    let values = strings(&e.values);
    quote! {
        ::pebble_core::schema::EnumType {
            name: #name.to_string(),
            values: #values,
        }
    }
}

fn quote_primary_key(pk: &Option<PrimaryKey>) -> TokenStream {
    match pk {
        Some(pk) => {
            let name = &pk.name;
            let columns = strings(&pk.columns);
            quote! {
                ::std::option::Option::Some(::pebble_core::schema::PrimaryKey {
                    name: #name.to_string(),
                    columns: #columns,
                })
            }
        }
        None => quote! { ::std::option::Option::None },
    }
}

/// Quotes the full `TableMetadata` as a literal constructor expression.
pub fn quote_table_metadata(meta: &TableMetadata) -> TokenStream {
    let name = &meta.name;
    let schema = &meta.schema;
    let go_type = opt_string(&meta.go_type);
    let columns = meta.columns.iter().map(quote_column);
    let primary_key = quote_primary_key(&meta.primary_key);
    let indexes = meta.indexes.iter().map(quote_index);
    let foreign_keys = meta.foreign_keys.iter().map(quote_foreign_key_metadata);
    let relationships = meta.relationships.iter().map(quote_relationship);
    let enum_types = meta.enum_types.iter().map(quote_enum_type);

    quote! {
        ::pebble_core::schema::TableMetadata {
            name: #name.to_string(),
            schema: #schema.to_string(),
            go_type: #go_type,
            columns: ::std::vec![ #(#columns),* ],
            primary_key: #primary_key,
            indexes: ::std::vec![ #(#indexes),* ],
            foreign_keys: ::std::vec![ #(#foreign_keys),* ],
            relationships: ::std::vec![ #(#relationships),* ],
            enum_types: ::std::vec![ #(#enum_types),* ],
        }
    }
}

/// Quotes `FromRow::from_row`: one conversion per declared column, relation
/// fields default-initialized (the Preloader fills them in later, spec.md
/// §4.7), unknown/missing row columns silently dropped (spec.md §4.4).
pub fn quote_from_row(ident: &Ident, columns: &[ColumnField], relations: &[RelationField]) -> TokenStream {
    let column_inits = columns.iter().map(|c| {
        let field_ident = &c.ident;
        let name = &c.column.name;
        let ty = &c.ty;
        let decode = if c.column.is_jsonb {
            quote! {
                ::pebble_core::scanner::decode_json::<#ty>(&src.value(idx)?)?.unwrap_or_default()
            }
        } else {
            quote! {
                <#ty as ::pebble_core::convert::FromSqlValue>::from_sql_value(src.value(idx)?)?
            }
        };
        quote! {
            #field_ident: match src.index_of(#name) {
                ::std::option::Option::Some(idx) => #decode,
                ::std::option::Option::None => ::std::default::Default::default(),
            }
        }
    });
    let relation_inits = relations.iter().map(|r| {
        let field_ident = &r.ident;
        quote! { #field_ident: ::std::default::Default::default() }
    });
    quote! {
        ::std::result::Result::Ok(#ident {
            #(#column_inits,)*
            #(#relation_inits,)*
        })
    }
}

/// Quotes `ToRow::to_fields`: one `FieldValue` per declared column in
/// declared order; relation fields never produce an entry (spec.md §3.1,
/// the `-` sentinel). JSONB columns are JSON-encoded to text, never to a
/// byte array (spec.md §4.4).
pub fn quote_to_row(columns: &[ColumnField]) -> TokenStream {
    let pushes = columns.iter().map(|c| {
        let field_ident = &c.ident;
        let name = &c.column.name;
        let is_zero = quote! { self.#field_ident == ::std::default::Default::default() };
        let value = if c.column.is_jsonb {
            quote! {
                ::pebble_core::scanner::encode_json(&self.#field_ident).expect("failed to encode jsonb column")
            }
        } else {
            quote! { ::std::convert::Into::<::pebble_core::value::SqlValue>::into(self.#field_ident.clone()) }
        };
        quote! {
            fields.push(::pebble_core::scanner::FieldValue::new(#name, #value, #is_zero));
        }
    });
    quote! {
        let mut fields = ::std::vec::Vec::new();
        #(#pushes)*
        fields
    }
}

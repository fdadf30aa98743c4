//! `#[derive(Table)]` and the `#[po(...)]` field attribute (spec.md §4.2,
//! §6): the proc-macro front end for the Tag Parser (C2).
//!
//! Grounded on the teacher's `procmacros::SQLiteTable` attribute macro
//! (`procmacros/src/sqlite/table.rs`) and `FromRow` derive
//! (`procmacros/src/lib.rs`): parse the struct at macro-expansion time,
//! reuse `pebble_core::tag` (the very parser the runtime AST-parsing
//! registration path also calls) rather than re-implementing tag syntax in
//! the macro, then quote the parsed `TableMetadata` back out as a literal
//! constructor plus `FromRow`/`ToRow`/`HasRelations` impls.

mod codegen;
mod relations;
mod table;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives [`pebble_core::registry::Table`], [`pebble_core::scanner::FromRow`],
/// [`pebble_core::scanner::ToRow`], and [`pebble_core::preload::HasRelations`]
/// from a struct's `#[po(...)]` field attributes and `table_name:`/`index:`
/// doc-comment directives (spec.md §6).
#[proc_macro_derive(Table, attributes(po))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match table::expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

//! Preloader (C10, spec.md §4.7): eliminates N+1 relationship loads while
//! preserving the shape the caller expects.
//!
//! Rust has no runtime reflection, so the actual per-relationship batched
//! query and field assignment is generated per (base type, relationship)
//! pair by `#[derive(Table)]` behind the [`RelationLoader`] trait. What
//! lives here is the dialect-independent part of the algorithm: splitting
//! and partitioning dot-paths, dispatching to the right loader by name, and
//! the batched-query/grouping helpers every generated loader builds on.

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;

use crate::driver::Executor;
use crate::error::{Error, Result};
use crate::expr::in_;
use crate::schema::RelationshipMetadata;
use crate::statement::SelectStatement;
use crate::value::SqlValue;

/// Splits a preload path on `.`, e.g. `"Client.Route"` → `["Client", "Route"]`.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Partitions a set of preload paths by their first segment (spec.md §4.7,
/// step 1): each key maps to the remaining dotted segments of every path
/// sharing that first segment (empty when the path was only one segment
/// deep). Owned so the result can outlive the input slice across an `.await`.
pub fn partition_paths_owned(paths: &[&str]) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for path in paths {
        let segments = split_path(path);
        let Some((head, rest)) = segments.split_first() else {
            continue;
        };
        let entry = grouped.entry((*head).to_string()).or_default();
        if !rest.is_empty() {
            entry.push(rest.join("."));
        }
    }
    grouped
}

/// Builds the common `SELECT ... FROM target WHERE fk_column = ANY($1)`
/// batched lookup every direct relationship loader issues (spec.md §4.7,
/// step 2).
pub fn batched_select_by_any(target_table: &str, fk_column: &str, keys: Vec<SqlValue>) -> SelectStatement {
    SelectStatement::new(target_table).filter(vec![in_(fk_column, keys)])
}

/// A hashable stand-in for an `SqlValue` used only to key the in-memory maps
/// generated relation loaders build while associating batched query results
/// back to their base rows (`SqlValue` itself carries floats and is not
/// `Hash`/`Eq`).
pub fn sql_value_key(value: &SqlValue) -> String {
    format!("{value:?}")
}

/// Groups owned rows by a key extracted from each row. Used to turn a flat
/// batched-query result into the per-base buckets hasMany/manyToMany
/// assignment needs (spec.md §4.7, step 3).
pub fn group_rows_by<T, K, F>(rows: Vec<T>, key_of: F) -> HashMap<K, Vec<T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut grouped: HashMap<K, Vec<T>> = HashMap::new();
    for row in rows {
        let key = key_of(&row);
        grouped.entry(key).or_default().push(row);
    }
    grouped
}

/// Implemented by generated code for one relationship field on a base
/// record type: knows how to batch-fetch and assign that single relation,
/// and — for nested paths — how to recurse into the freshly loaded
/// children using their own `HasRelations` impl.
#[async_trait]
pub trait RelationLoader<Base: Send>: Send + Sync {
    fn metadata(&self) -> &RelationshipMetadata;

    /// Loads this relation onto every element of `bases`, then applies
    /// `rest` (nested path segments below this one, if any) to the loaded
    /// children. `rest` is empty for a direct (single-segment) path.
    async fn load(&self, bases: &mut [Base], rest: &[String], executor: &dyn Executor) -> Result<()>;
}

/// Implemented by generated code for a base record type: resolves a
/// relationship field's name to its loader.
pub trait HasRelations: Sized + Send {
    fn relation_loader(name: &str) -> Option<Box<dyn RelationLoader<Self>>>;
}

/// Applies a set of preload paths to an already-fetched slice of base
/// records (spec.md §4.7). Direct and first-level-of-nested paths are
/// dispatched by name; an unrecognized relationship name fails the whole
/// preload with `UnknownRelationship` rather than silently skipping it.
pub async fn preload_paths<Base>(bases: &mut [Base], paths: &[&str], executor: &dyn Executor) -> Result<()>
where
    Base: HasRelations,
{
    if bases.is_empty() || paths.is_empty() {
        return Ok(());
    }
    let grouped = partition_paths_owned(paths);
    for (head, rest) in grouped {
        let loader = Base::relation_loader(&head)
            .ok_or_else(|| Error::UnknownRelationship(head.as_str().into()))?;
        loader.load(bases, &rest, executor).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_dot_path() {
        assert_eq!(split_path("Client.Route"), vec!["Client", "Route"]);
        assert_eq!(split_path("Posts"), vec!["Posts"]);
    }

    #[test]
    fn partitions_direct_and_nested() {
        let paths = vec!["Posts", "Client.Route", "Client.Billing"];
        let grouped = partition_paths_owned(&paths);
        assert_eq!(grouped.get("Posts"), Some(&Vec::<String>::new()));
        let mut client_rest = grouped.get("Client").cloned().unwrap();
        client_rest.sort();
        assert_eq!(client_rest, vec!["Billing".to_string(), "Route".to_string()]);
    }

    #[test]
    fn groups_rows_by_foreign_key() {
        let rows = vec![(1, "a"), (1, "b"), (2, "c")];
        let grouped = group_rows_by(rows, |(fk, _)| *fk);
        assert_eq!(grouped.get(&1).unwrap().len(), 2);
        assert_eq!(grouped.get(&2).unwrap().len(), 1);
    }

    #[test]
    fn batched_select_uses_any_predicate() {
        let stmt = batched_select_by_any("posts", "author_id", vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let rendered = stmt.render();
        assert_eq!(rendered.sql, "SELECT * FROM posts WHERE author_id = ANY($1)");
    }
}

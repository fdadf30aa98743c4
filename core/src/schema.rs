//! Canonical schema graph (spec.md §3.1): `TableMetadata`, `ColumnMetadata`,
//! `IndexMetadata`, `ForeignKeyMetadata`, `RelationshipMetadata`, `EnumType`.
//!
//! This is the shape both the Tag Parser (C2, from annotations) and the
//! Introspector (C4, from the live catalog) produce, so the Differ (C5) can
//! compare them structurally without caring where either side came from.

use std::collections::BTreeMap;

/// Sentinel column name marking a relationship field (spec.md §3.1).
pub const RELATIONSHIP_SENTINEL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityGeneration {
    Always,
    ByDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub generation: IdentityGeneration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub expression: String,
    pub stored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "cascade" => ReferentialAction::Cascade,
            "restrict" => ReferentialAction::Restrict,
            "setnull" | "set_null" | "set null" => ReferentialAction::SetNull,
            "setdefault" | "set_default" | "set default" => ReferentialAction::SetDefault,
            _ => ReferentialAction::NoAction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnForeignKey {
    pub target_table: String,
    pub target_column: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// A single column in a table, produced either from tag parsing or from
/// catalog introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub go_field: String,
    pub sql_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
    pub is_primary_key: bool,
    pub is_jsonb: bool,
    pub identity: Option<Identity>,
    pub generated: Option<Generated>,
    pub collation: Option<String>,
    pub operator_class: Option<String>,
    pub foreign_key: Option<ColumnForeignKey>,
    pub check: Option<String>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, go_field: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            go_field: go_field.into(),
            sql_type: sql_type.into(),
            nullable: true,
            unique: false,
            default: None,
            auto_increment: false,
            is_primary_key: false,
            is_jsonb: false,
            identity: None,
            generated: None,
            collation: None,
            operator_class: None,
            foreign_key: None,
            check: None,
        }
    }

    /// Whether this column is skipped from an INSERT's column list when the
    /// host value is the zero value (the "smart default" rule, spec.md §3.1
    /// and §4.4). Only the presence of a server-side default or identity
    /// triggers omission; auto-increment primary keys are handled alongside.
    pub fn has_smart_default(&self) -> bool {
        self.default.is_some() || self.identity.is_some() || self.auto_increment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Btree,
    Gin,
    Gist,
    Brin,
    Hash,
}

impl IndexType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IndexType::Btree => "btree",
            IndexType::Gin => "gin",
            IndexType::Gist => "gist",
            IndexType::Brin => "brin",
            IndexType::Hash => "hash",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "gin" => IndexType::Gin,
            "gist" => IndexType::Gist,
            "brin" => IndexType::Brin,
            "hash" => IndexType::Hash,
            _ => IndexType::Btree,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsPosition {
    First,
    Last,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    /// A bare column name, or an arbitrary expression (e.g. `lower(email)`).
    pub expression: String,
    pub direction: SortDirection,
    pub nulls: NullsPosition,
    pub operator_class: Option<String>,
}

impl IndexColumn {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expression: expr.into(),
            direction: SortDirection::Asc,
            nulls: NullsPosition::Default,
            operator_class: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMetadata {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub include: Vec<String>,
    pub r#where: Option<String>,
    pub index_type: IndexType,
    pub unique: bool,
    pub concurrent: bool,
}

impl IndexMetadata {
    /// Auto-generates `idx_<table>_<cols>` when no explicit name is given
    /// (spec.md §3.1).
    pub fn auto_name(table: &str, columns: &[IndexColumn]) -> String {
        let cols: Vec<&str> = columns
            .iter()
            .map(|c| c.expression.as_str())
            .collect();
        format!("idx_{}_{}", table, cols.join("_"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipType {
    BelongsTo,
    HasOne,
    HasMany,
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipMetadata {
    pub source_field: String,
    pub kind: RelationshipType,
    pub target_type: String,
    pub target_table: String,
    pub foreign_key: String,
    pub references: String,
    pub join_table: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyMetadata {
    pub name: String,
    pub columns: Vec<String>,
    pub target_table: String,
    pub target_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

/// Canonical in-memory description of one database table.
///
/// Produced by the Tag Parser (C2) from a host record type's annotations, or
/// by the Introspector (C4) from the live catalog; both paths fill this
/// struct identically so the Differ (C5) can compare them structurally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableMetadata {
    pub name: String,
    pub schema: String,
    /// Present when this table was built from a host record type rather
    /// than from catalog introspection (spec.md §3.1).
    pub go_type: Option<String>,
    pub columns: Vec<ColumnMetadata>,
    pub primary_key: Option<PrimaryKey>,
    pub indexes: Vec<IndexMetadata>,
    pub foreign_keys: Vec<ForeignKeyMetadata>,
    pub relationships: Vec<RelationshipMetadata>,
    pub enum_types: Vec<EnumType>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: "public".to_string(),
            go_type: None,
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            relationships: Vec::new(),
            enum_types: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relationship(&self, field: &str) -> Option<&RelationshipMetadata> {
        self.relationships.iter().find(|r| r.source_field == field)
    }

    /// Columns keyed by name, stable-ordered for diffing and DDL emission.
    pub fn columns_by_name(&self) -> BTreeMap<&str, &ColumnMetadata> {
        self.columns.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_default_rule() {
        let mut col = ColumnMetadata::new("id", "ID", "uuid");
        assert!(!col.has_smart_default());
        col.default = Some("gen_random_uuid()".into());
        assert!(col.has_smart_default());
    }

    #[test]
    fn auto_index_name() {
        let cols = vec![IndexColumn::new("email"), IndexColumn::new("tenant_id")];
        assert_eq!(IndexMetadata::auto_name("users", &cols), "idx_users_email_tenant_id");
    }
}

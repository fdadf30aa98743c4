//! Tag Parser (C2): turns the `po` field metadata string into `ColumnMetadata`
//! (spec.md §4.2), plus the table-level comment directives (`table_name:`,
//! `index:`) and relationship directives on the `-` sentinel field.

use crate::error::{Error, Result};
use crate::schema::{
    ColumnForeignKey, ColumnMetadata, Generated, Identity, IdentityGeneration, IndexColumn,
    IndexMetadata, IndexType, NullsPosition, ReferentialAction, RelationshipMetadata,
    RelationshipType, SortDirection, RELATIONSHIP_SENTINEL,
};
use crate::types::SqlType;
use compact_str::CompactString;

/// One parsed `po` tag option: either a bare identifier, or `name(args)`.
#[derive(Debug, Clone, PartialEq)]
enum Opt<'a> {
    Bare(&'a str),
    Call(&'a str, &'a str),
    /// `fk:table.col` style, colon-delimited rather than paren-delimited.
    Colon(&'a str, &'a str),
}

/// Splits a tag body on commas that are not nested inside parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

fn parse_opt(raw: &str) -> Opt<'_> {
    if let Some(open) = raw.find('(') {
        if raw.ends_with(')') {
            let name = raw[..open].trim();
            let args = raw[open + 1..raw.len() - 1].trim();
            return Opt::Call(name, args);
        }
    }
    if let Some(colon) = raw.find(':') {
        let name = raw[..colon].trim();
        let args = raw[colon + 1..].trim();
        return Opt::Colon(name, args);
    }
    Opt::Bare(raw.trim())
}

/// The result of parsing one field's `po` tag: either a column, or (when the
/// column name is the `-` sentinel) a relationship.
#[derive(Debug, Clone)]
pub enum TagResult {
    Column {
        column: ColumnMetadata,
        indexes: Vec<IndexMetadata>,
    },
    Relationship(RelationshipMetadata),
}

/// Parses one field's `po` tag.
///
/// `table` is the owning table's name (used to auto-name single-column
/// indexes); `go_field` is the host record field name.
pub fn parse_field_tag(table: &str, go_field: &str, tag: &str) -> Result<TagResult> {
    let parts = split_top_level(tag);
    let mut iter = parts.into_iter();
    let name = iter.next().unwrap_or("").trim();
    if name.is_empty() {
        return Err(Error::metadata(format!(
            "empty po tag on field '{go_field}'"
        )));
    }

    if name == RELATIONSHIP_SENTINEL {
        return parse_relationship(go_field, iter.collect());
    }

    parse_column(table, go_field, name, iter.collect())
}

fn parse_column(
    table: &str,
    go_field: &str,
    column_name: &str,
    opts: Vec<&str>,
) -> Result<TagResult> {
    let mut column = ColumnMetadata::new(column_name, go_field, "");
    let mut explicit_type: Option<SqlType> = None;
    let mut indexes = Vec::new();

    let conflict = |detail: &str| {
        Error::ConflictingOptions {
            column: CompactString::new(column_name),
            detail: CompactString::new(detail),
        }
    };

    for raw in opts {
        if raw.is_empty() {
            continue;
        }
        match parse_opt(raw) {
            Opt::Bare("primaryKey") => {
                column.is_primary_key = true;
                column.nullable = false;
            }
            Opt::Bare("serial") => {
                set_type(&mut explicit_type, SqlType::Serial, &conflict)?;
                column.auto_increment = true;
            }
            Opt::Bare("bigserial") => {
                set_type(&mut explicit_type, SqlType::BigSerial, &conflict)?;
                column.auto_increment = true;
            }
            Opt::Bare("autoIncrement") => {
                column.auto_increment = true;
            }
            Opt::Bare("notNull") => column.nullable = false,
            Opt::Bare("unique") => column.unique = true,
            Opt::Bare("jsonb") => {
                set_type(&mut explicit_type, SqlType::Jsonb, &conflict)?;
                column.is_jsonb = true;
            }
            Opt::Bare("uuid") => set_type(&mut explicit_type, SqlType::Uuid, &conflict)?,
            Opt::Bare("integer") => set_type(&mut explicit_type, SqlType::Integer, &conflict)?,
            Opt::Bare("bigint") => set_type(&mut explicit_type, SqlType::BigInt, &conflict)?,
            Opt::Bare("text") => set_type(&mut explicit_type, SqlType::Text, &conflict)?,
            Opt::Bare("boolean") => set_type(&mut explicit_type, SqlType::Boolean, &conflict)?,
            Opt::Bare("timestamp") => set_type(&mut explicit_type, SqlType::Timestamp, &conflict)?,
            Opt::Bare("timestamptz") => {
                set_type(&mut explicit_type, SqlType::TimestampTz, &conflict)?
            }
            Opt::Bare("identity") => {
                column.identity = Some(Identity {
                    generation: IdentityGeneration::ByDefault,
                });
            }
            Opt::Bare("stored") => {
                if let Some(gen) = column.generated.as_mut() {
                    gen.stored = true;
                } else {
                    return Err(Error::metadata(format!(
                        "'stored' without 'generated:<expr>' on column '{column_name}'"
                    )));
                }
            }
            Opt::Bare("index") => {
                indexes.push(single_column_index(table, column_name, None, None, None, None));
            }
            Opt::Bare(other) if other.ends_with("[]") => {
                let elem = SqlType::parse(&other[..other.len() - 2]);
                set_type(&mut explicit_type, SqlType::Array(Box::new(elem)), &conflict)?;
            }
            Opt::Bare(other) => {
                return Err(Error::UnknownOption {
                    column: CompactString::new(column_name),
                    option: CompactString::new(other),
                });
            }
            Opt::Call("varchar", args) => {
                let n: u32 = args.trim().parse().map_err(|_| {
                    Error::metadata(format!("invalid varchar length '{args}' on '{column_name}'"))
                })?;
                set_type(&mut explicit_type, SqlType::Varchar(Some(n)), &conflict)?;
            }
            Opt::Call("numeric", args) => {
                let mut parts = args.splitn(2, ',');
                let p = parts.next().and_then(|p| p.trim().parse().ok());
                let s = parts.next().and_then(|s| s.trim().parse().ok());
                set_type(
                    &mut explicit_type,
                    SqlType::Numeric {
                        precision: p,
                        scale: s,
                    },
                    &conflict,
                )?;
            }
            Opt::Call("default", args) => column.default = Some(args.to_string()),
            Opt::Call("check", args) => column.check = Some(args.to_string()),
            Opt::Call("enum", args) => {
                let values: Vec<String> = args
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                let enum_name = format!("{table}_{column_name}");
                set_type(&mut explicit_type, SqlType::Enum(enum_name), &conflict)?;
                let _ = values; // member list is recovered by `parse_enum_values`
            }
            Opt::Call("identity", args) => {
                let generation = match args.trim() {
                    "always" => IdentityGeneration::Always,
                    "by-default" | "byDefault" | "by_default" => IdentityGeneration::ByDefault,
                    other => {
                        return Err(Error::metadata(format!(
                            "invalid identity generation '{other}' on column '{column_name}'"
                        )))
                    }
                };
                column.identity = Some(Identity { generation });
            }
            Opt::Call("generated", args) => {
                column.generated = Some(Generated {
                    expression: args.to_string(),
                    stored: false,
                });
            }
            Opt::Call("index", args) => {
                indexes.push(parse_index_call(table, column_name, args)?);
            }
            Opt::Colon("fk", args) => {
                let (tgt_table, tgt_col) = args.split_once('.').ok_or_else(|| {
                    Error::metadata(format!(
                        "invalid fk target '{args}' on column '{column_name}', expected table.column"
                    ))
                })?;
                column.foreign_key = Some(ColumnForeignKey {
                    target_table: tgt_table.to_string(),
                    target_column: tgt_col.to_string(),
                    on_delete: ReferentialAction::NoAction,
                    on_update: ReferentialAction::NoAction,
                });
            }
            Opt::Colon("ondelete", args) => {
                apply_fk_action(&mut column, column_name, args, true)?;
            }
            Opt::Colon("onupdate", args) => {
                apply_fk_action(&mut column, column_name, args, false)?;
            }
            Opt::Colon("generated", args) => {
                column.generated = Some(Generated {
                    expression: args.to_string(),
                    stored: false,
                });
            }
            Opt::Colon(other, _) => {
                return Err(Error::UnknownOption {
                    column: CompactString::new(column_name),
                    option: CompactString::new(other),
                });
            }
            Opt::Call(other, _) => {
                return Err(Error::UnknownOption {
                    column: CompactString::new(column_name),
                    option: CompactString::new(other),
                });
            }
        }
    }

    column.sql_type = explicit_type.unwrap_or(SqlType::Text).render();

    for idx in indexes.iter_mut() {
        if idx.columns.is_empty() {
            idx.columns.push(IndexColumn::new(column_name));
        }
        if idx.name.is_empty() {
            idx.name = IndexMetadata::auto_name(table, &idx.columns);
        }
    }

    Ok(TagResult::Column { column, indexes })
}

/// Re-extracts the ordered enum member list from a raw tag string containing
/// an `enum(v1,v2,...)` option. Exposed so the registry can attach
/// `EnumType` entries to `TableMetadata` without this module needing its own
/// mutable scratch state.
pub fn parse_enum_values(tag: &str) -> Option<Vec<String>> {
    for raw in split_top_level(tag) {
        if let Opt::Call("enum", args) = parse_opt(raw) {
            return Some(
                args.split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            );
        }
    }
    None
}

fn set_type(
    slot: &mut Option<SqlType>,
    ty: SqlType,
    conflict: &dyn Fn(&str) -> Error,
) -> Result<()> {
    if slot.is_some() {
        return Err(conflict("multiple SQL types declared"));
    }
    *slot = Some(ty);
    Ok(())
}

fn apply_fk_action(
    column: &mut ColumnMetadata,
    column_name: &str,
    action: &str,
    is_delete: bool,
) -> Result<()> {
    let fk = column.foreign_key.as_mut().ok_or_else(|| {
        Error::metadata(format!(
            "'{}' without 'fk:' on column '{column_name}'",
            if is_delete { "ondelete" } else { "onupdate" }
        ))
    })?;
    let parsed = ReferentialAction::parse(action);
    if is_delete {
        fk.on_delete = parsed;
    } else {
        fk.on_update = parsed;
    }
    Ok(())
}

fn single_column_index(
    table: &str,
    column: &str,
    name: Option<&str>,
    index_type: Option<IndexType>,
    direction: Option<SortDirection>,
    nulls: Option<NullsPosition>,
) -> IndexMetadata {
    let mut idx_col = IndexColumn::new(column);
    if let Some(dir) = direction {
        idx_col.direction = dir;
    }
    if let Some(n) = nulls {
        idx_col.nulls = n;
    }
    let columns = vec![idx_col];
    let name = name
        .map(|s| s.to_string())
        .unwrap_or_else(|| IndexMetadata::auto_name(table, &columns));
    IndexMetadata {
        name,
        columns,
        include: Vec::new(),
        r#where: None,
        index_type: index_type.unwrap_or(IndexType::Btree),
        unique: false,
        concurrent: false,
    }
}

/// Parses `index(name, type, order, nullsPos, opclass)` (spec.md §4.2); all
/// positional args after `name` are optional.
fn parse_index_call(table: &str, column: &str, args: &str) -> Result<IndexMetadata> {
    let parts: Vec<&str> = args.split(',').map(|s| s.trim()).collect();
    let name = parts.first().filter(|s| !s.is_empty()).copied();
    let index_type = parts
        .get(1)
        .filter(|s| !s.is_empty())
        .map(|s| IndexType::parse(s));
    let direction = parts.get(2).and_then(|s| match s.to_ascii_lowercase().as_str() {
        "desc" => Some(SortDirection::Desc),
        "asc" => Some(SortDirection::Asc),
        _ => None,
    });
    let nulls = parts.get(3).and_then(|s| match s.to_ascii_lowercase().as_str() {
        "first" => Some(NullsPosition::First),
        "last" => Some(NullsPosition::Last),
        _ => None,
    });
    let mut idx = single_column_index(table, column, name, index_type, direction, nulls);
    if let Some(opclass) = parts.get(4).filter(|s| !s.is_empty()) {
        idx.columns[0].operator_class = Some(opclass.to_string());
    }
    Ok(idx)
}

fn parse_relationship(go_field: &str, opts: Vec<&str>) -> Result<TagResult> {
    let mut kind: Option<RelationshipType> = None;
    let mut args: Vec<(String, String)> = Vec::new();

    for raw in opts {
        match parse_opt(raw) {
            Opt::Bare("hasOne") => kind = Some(RelationshipType::HasOne),
            Opt::Bare("belongsTo") => kind = Some(RelationshipType::BelongsTo),
            Opt::Bare("hasMany") => kind = Some(RelationshipType::HasMany),
            Opt::Bare("manyToMany") => kind = Some(RelationshipType::ManyToMany),
            Opt::Call(name, body) => {
                let parsed_kind = match name {
                    "hasOne" => Some(RelationshipType::HasOne),
                    "belongsTo" => Some(RelationshipType::BelongsTo),
                    "hasMany" => Some(RelationshipType::HasMany),
                    "manyToMany" => Some(RelationshipType::ManyToMany),
                    _ => None,
                };
                if let Some(k) = parsed_kind {
                    kind = Some(k);
                    for kv in body.split(',') {
                        if let Some((k, v)) = kv.split_once('=') {
                            args.push((k.trim().to_string(), v.trim().to_string()));
                        }
                    }
                } else {
                    return Err(Error::UnknownOption {
                        column: CompactString::new(go_field),
                        option: CompactString::new(name),
                    });
                }
            }
            Opt::Bare(other) => {
                return Err(Error::UnknownOption {
                    column: CompactString::new(go_field),
                    option: CompactString::new(other),
                })
            }
            Opt::Colon(other, _) => {
                return Err(Error::UnknownOption {
                    column: CompactString::new(go_field),
                    option: CompactString::new(other),
                })
            }
        }
    }

    let kind = kind.ok_or_else(|| Error::InvalidRelationship {
        field: CompactString::new(go_field),
        detail: CompactString::new("missing relationship kind (hasOne/hasMany/belongsTo/manyToMany)"),
    })?;

    let arg = |key: &str| args.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());

    if kind == RelationshipType::ManyToMany && arg("joinTable").is_none() {
        return Err(Error::InvalidRelationship {
            field: CompactString::new(go_field),
            detail: CompactString::new("manyToMany requires joinTable="),
        });
    }

    Ok(TagResult::Relationship(RelationshipMetadata {
        source_field: go_field.to_string(),
        kind,
        // Target type/table are resolved later by the registry once the
        // host field's declared type is known (spec.md §9: relationships
        // are held as names + target-type references to keep registration
        // order-independent).
        target_type: String::new(),
        target_table: String::new(),
        foreign_key: arg("foreignKey").unwrap_or_default(),
        references: arg("references").unwrap_or_else(|| "id".to_string()),
        join_table: arg("joinTable"),
    }))
}

/// A table-level directive discovered as a comment annotation
/// (spec.md §4.2, §6): `table_name: <name>` or a complex `index: ...` line.
#[derive(Debug, Clone)]
pub enum TableDirective {
    TableName(String),
    Index(IndexMetadata),
}

/// Parses one comment directive line (without the leading `//`).
pub fn parse_table_directive(table: &str, line: &str) -> Result<Option<TableDirective>> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("table_name:") {
        return Ok(Some(TableDirective::TableName(rest.trim().to_string())));
    }
    if let Some(rest) = line.strip_prefix("index:") {
        return Ok(Some(TableDirective::Index(parse_full_index_directive(
            table,
            rest.trim(),
        )?)));
    }
    Ok(None)
}

/// Parses `<name> ON (<expr-list>) [INCLUDE (<cols>)] [WHERE <pred>] [USING <type>] [CONCURRENTLY]`.
fn parse_full_index_directive(table: &str, s: &str) -> Result<IndexMetadata> {
    let on_pos = s.find(" ON ").ok_or_else(|| {
        Error::metadata(format!("index directive missing ' ON (...)': '{s}'"))
    })?;
    let name = s[..on_pos].trim().to_string();
    let rest = s[on_pos + 4..].trim();

    let open = rest.find('(').ok_or_else(|| Error::metadata("index directive missing column list"))?;
    let close = find_matching_paren(rest, open)?;
    let col_list = &rest[open + 1..close];
    let mut tail = rest[close + 1..].trim();

    let columns = split_top_level(col_list)
        .into_iter()
        .map(parse_index_directive_column)
        .collect();

    let mut include = Vec::new();
    if let Some(pos) = tail.find("INCLUDE") {
        let after = tail[pos + "INCLUDE".len()..].trim_start();
        let open = after
            .find('(')
            .ok_or_else(|| Error::metadata("INCLUDE missing column list"))?;
        let close = find_matching_paren(after, open)?;
        include = split_top_level(&after[open + 1..close])
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        tail = &after[close + 1..];
    }

    let mut r#where = None;
    let mut index_type = IndexType::Btree;
    let mut concurrent = false;

    if let Some(pos) = tail.find("CONCURRENTLY") {
        concurrent = true;
        tail = &tail[..pos];
    }
    if let Some(pos) = tail.find("USING") {
        let after = tail[pos + "USING".len()..].trim();
        let type_word: String = after.chars().take_while(|c| c.is_alphanumeric()).collect();
        index_type = IndexType::parse(&type_word);
        tail = &tail[..pos];
    }
    if let Some(pos) = tail.find("WHERE") {
        let after = tail[pos + "WHERE".len()..].trim();
        r#where = Some(after.to_string());
    }

    let name = if name.is_empty() {
        IndexMetadata::auto_name(table, &columns)
    } else {
        name
    };

    Ok(IndexMetadata {
        name,
        columns,
        include,
        r#where,
        index_type,
        unique: false,
        concurrent,
    })
}

fn parse_index_directive_column(s: &str) -> IndexColumn {
    let mut s = s.trim();
    let mut direction = SortDirection::Asc;
    let mut nulls = NullsPosition::Default;
    if let Some(pos) = s.to_ascii_uppercase().find("NULLS FIRST") {
        nulls = NullsPosition::First;
        s = s[..pos].trim();
    } else if let Some(pos) = s.to_ascii_uppercase().find("NULLS LAST") {
        nulls = NullsPosition::Last;
        s = s[..pos].trim();
    }
    if let Some(stripped) = strip_suffix_ci(s, "DESC") {
        direction = SortDirection::Desc;
        s = stripped.trim();
    } else if let Some(stripped) = strip_suffix_ci(s, "ASC") {
        s = stripped.trim();
    }
    let mut col = IndexColumn::new(s);
    col.direction = direction;
    col.nulls = nulls;
    col
}

fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() >= suffix.len() && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        Some(&s[..s.len() - suffix.len()])
    } else {
        None
    }
}

fn find_matching_paren(s: &str, open: usize) -> Result<usize> {
    let mut depth = 0i32;
    for (i, ch) in s.char_indices().skip(open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(Error::metadata("unbalanced parentheses in index directive"))
}

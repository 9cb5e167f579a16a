//! Relational schemas read from live SQL catalogs.
//!
//! Both dialects produce the same [`Database`] model. Catalog access sits
//! behind a per-dialect trait so the extraction logic can be driven by an
//! in-memory catalog in tests.

pub mod mysql;
pub mod plantuml;
pub mod postgres;

use serde::{Deserialize, Serialize};

use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub schemas: Vec<Schema>,
}

impl Database {
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.schemas
            .iter()
            .filter(|s| s.name == schema)
            .flat_map(|s| s.tables.iter())
            .find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.schemas.iter().map(|s| s.tables.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub materialized_views: Vec<View>,
    pub functions: Vec<Function>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Parent tables, as the catalog names them (possibly schema-qualified).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,
}

impl Table {
    pub fn primary_key(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    /// `None` when the column has no default; an empty expression is kept as `Some("")`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ColumnStatistics>,
}

impl Column {
    /// Declared type followed by `DEFAULT x` and any dialect extra.
    pub fn type_description(&self) -> String {
        let mut parts = vec![self.data_type.clone()];
        if let Some(default) = self.default.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("DEFAULT {}", default));
        }
        if !self.extra.is_empty() {
            parts.push(self.extra.clone());
        }
        parts.join(" ")
    }
}

/// Planner statistics for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub null_frac: f64,
    pub avg_width: i32,
    pub n_distinct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    /// Columns in their position order within the index.
    pub columns: Vec<String>,
    pub index_type: String,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_schema: String,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    pub deferrable: bool,
}

/// Action taken on the referencing rows when the referenced row changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ReferentialAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Decode a `pg_constraint.confdeltype`-style code. Unknown codes mean NO ACTION.
    pub fn from_code(code: &str) -> Self {
        match code {
            "r" => Self::Restrict,
            "c" => Self::Cascade,
            "n" => Self::SetNull,
            "d" => Self::SetDefault,
            _ => Self::NoAction,
        }
    }

    /// Decode an `information_schema` rule name such as `SET NULL`.
    pub fn from_rule(rule: &str) -> Self {
        match rule.trim().to_uppercase().as_str() {
            "RESTRICT" => Self::Restrict,
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            _ => Self::NoAction,
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain or materialized view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub columns: Vec<Column>,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Only materialized views carry indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Volatility {
    Immutable,
    Stable,
    #[default]
    Volatile,
}

impl Volatility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immutable => "IMMUTABLE",
            Self::Stable => "STABLE",
            Self::Volatile => "VOLATILE",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "i" => Self::Immutable,
            "s" => Self::Stable,
            _ => Self::Volatile,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Security {
    Definer,
    #[default]
    Invoker,
}

impl Security {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Definer => "DEFINER",
            Self::Invoker => "INVOKER",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArgumentMode {
    #[default]
    In,
    Out,
    InOut,
    Variadic,
    Table,
}

impl ArgumentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
            Self::Variadic => "VARIADIC",
            Self::Table => "TABLE",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "o" => Self::Out,
            "b" => Self::InOut,
            "v" => Self::Variadic,
            "t" => Self::Table,
            _ => Self::In,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionArgument {
    pub name: String,
    pub data_type: String,
    pub mode: ArgumentMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub schema: String,
    pub arguments: Vec<FunctionArgument>,
    pub return_type: String,
    pub language: String,
    pub volatility: Volatility,
    pub security: Security,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Split a comma-separated catalog aggregate, dropping empty items.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn table_ref(schema: &str, name: &str) -> EntityRef {
    EntityRef::scoped(EntityKind::Table, schema, name)
}

/// Resolve an inheritance parent, which may be written `schema.table`.
fn parent_ref(schema: &str, parent: &str) -> EntityRef {
    match parent.split_once('.') {
        Some((s, t)) => table_ref(s.trim_matches('"'), t.trim_matches('"')),
        None => table_ref(schema, parent.trim_matches('"')),
    }
}

/// Lower a database into schemas, tables and views with `contains`,
/// `references` and `inherits` relations.
pub fn build_graph(db: &Database) -> EntityGraph {
    let mut graph = EntityGraph::new();

    for schema in &db.schemas {
        let schema_ref = EntityRef::new(EntityKind::Schema, &schema.name);
        if let Err(e) = graph.add_entity(EntityNode::new(schema_ref.clone())) {
            log::warn!("{}", e);
        }

        for table in &schema.tables {
            let node = EntityNode::new(table_ref(&schema.name, &table.name))
                .with_doc(table.comment.clone())
                .with_attr("columns", table.columns.len().to_string());
            if let Err(e) = graph.add_entity(node) {
                log::warn!("{}", e);
                continue;
            }
            graph.add_relation(
                &schema_ref,
                &table_ref(&schema.name, &table.name),
                RelationKind::Contains,
                None,
            );
        }

        for (views, kind) in [
            (&schema.views, EntityKind::View),
            (&schema.materialized_views, EntityKind::MaterializedView),
        ] {
            for view in views.iter() {
                let view_ref = EntityRef::scoped(kind, &schema.name, &view.name);
                let node = EntityNode::new(view_ref.clone()).with_doc(view.comment.clone());
                if let Err(e) = graph.add_entity(node) {
                    log::warn!("{}", e);
                    continue;
                }
                graph.add_relation(&schema_ref, &view_ref, RelationKind::Contains, None);
            }
        }
    }

    for schema in &db.schemas {
        for table in &schema.tables {
            let from = table_ref(&schema.name, &table.name);
            for fk in &table.foreign_keys {
                graph.add_relation(
                    &from,
                    &table_ref(&fk.ref_schema, &fk.ref_table),
                    RelationKind::References,
                    Some(fk.on_delete.as_str().to_string()),
                );
            }
            for parent in &table.inherits {
                graph.add_relation(
                    &from,
                    &parent_ref(&schema.name, parent),
                    RelationKind::Inherits,
                    None,
                );
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn referential_codes_decode() {
        assert_eq!(ReferentialAction::from_code("a"), ReferentialAction::NoAction);
        assert_eq!(ReferentialAction::from_code("r"), ReferentialAction::Restrict);
        assert_eq!(ReferentialAction::from_code("c"), ReferentialAction::Cascade);
        assert_eq!(ReferentialAction::from_code("n"), ReferentialAction::SetNull);
        assert_eq!(ReferentialAction::from_code("d"), ReferentialAction::SetDefault);
        assert_eq!(ReferentialAction::from_code("?"), ReferentialAction::NoAction);
        assert_eq!(ReferentialAction::from_rule("set null"), ReferentialAction::SetNull);
    }

    #[test]
    fn action_serialises_as_sql_keyword() {
        let json = serde_json::to_string(&ReferentialAction::SetDefault).unwrap();
        assert_eq!(json, "\"SET DEFAULT\"");
    }

    #[test]
    fn type_description_skips_empty_default() {
        let mut col = Column {
            name: "id".into(),
            data_type: "int".into(),
            default: Some(String::new()),
            extra: "auto_increment".into(),
            ..Default::default()
        };
        assert_eq!(col.type_description(), "int auto_increment");
        col.default = Some("0".into());
        assert_eq!(col.type_description(), "int DEFAULT 0 auto_increment");
    }

    #[test]
    fn inheritance_parent_may_be_qualified() {
        let mut child = Table {
            schema: "sales".into(),
            name: "orders_2024".into(),
            inherits: vec!["archive.orders".into()],
            ..Default::default()
        };
        child.columns.push(Column::default());
        let mut schema = Schema::new("sales");
        schema.tables.push(child);
        let graph = build_graph(&Database {
            name: "shop".into(),
            schemas: vec![schema],
        });
        let rels = graph.relations_of_kind(RelationKind::Inherits);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].to, table_ref("archive", "orders"));
        assert_eq!(graph.dangling(), vec![&table_ref("archive", "orders")]);
    }
}

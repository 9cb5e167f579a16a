//! PlantUML entity-relationship diagram and Markdown listing for a database.

use std::fmt::Write;

use super::{Column, Database, Index, Table, View};
use crate::render::{escape, plantuml, Container, Diagram, Edge, Node, Note, Section, Shape, UniqueIds};

fn preamble() -> Vec<String> {
    [
        "!theme plain",
        "skinparam linetype polyline",
        "skinparam ranksep 80",
        "skinparam nodesep 80",
        "skinparam roundcorner 5",
        "skinparam shadowing false",
        "skinparam handwritten false",
        "skinparam class {",
        "  BackgroundColor White",
        "  ArrowColor Gray",
        "  BorderColor Gray",
        "}",
        "set namespaceSeparator none",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Diagram identifiers of schema-qualified relations, unique per document.
#[derive(Default)]
struct RelationIds {
    ids: UniqueIds,
}

impl RelationIds {
    fn id(&mut self, schema: &str, name: &str) -> String {
        self.ids
            .id_for(&format!("{}\0{}", schema, name), &format!("{}.{}", schema, name))
    }
}

fn column_line(marker: Option<&str>, col: &Column) -> String {
    let mut line = match marker {
        Some(m) => format!("{} {} : {}", m, col.name, col.type_description()),
        None => format!("{} : {}", col.name, col.type_description()),
    };
    if let Some(comment) = &col.comment {
        let _ = write!(line, " <<{}>>", escape(comment));
    }
    line
}

fn index_lines(indexes: &[Index]) -> Vec<String> {
    indexes
        .iter()
        .filter(|idx| idx.name != "PRIMARY")
        .map(|idx| {
            let marker = if idx.unique { "*" } else { "+" };
            let mut line = format!("{} {}({})", marker, idx.name, idx.columns.join(", "));
            if let Some(pred) = &idx.predicate {
                let _ = write!(line, " WHERE {}", pred);
            }
            line
        })
        .collect()
}

fn table_node(table: &Table, id: String) -> Node {
    let pk: Vec<String> = table
        .primary_key()
        .map(|c| column_line(Some("*"), c))
        .collect();
    let others: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !c.primary_key)
        .map(|c| column_line(Some(if c.nullable { "o" } else { "+" }), c))
        .collect();

    let mut rest = Section::plain(others);
    if !pk.is_empty() {
        rest = rest.divided();
    }

    let mut node = Node::new(Shape::Entity, id, table.name.clone())
        .section(Section::plain(pk))
        .section(rest)
        .section(Section::titled("Indexes", index_lines(&table.indexes)).divided())
        .section(
            Section::titled(
                "Inherits",
                table.inherits.iter().map(|p| format!("+ {}", p)).collect(),
            )
            .divided(),
        );

    if let Some(comment) = &table.comment {
        node = node.note(Note::below(comment.lines().map(String::from).collect()));
    }
    node
}

fn view_node(view: &View, stereotype: &str, id: String) -> Node {
    let mut node = Node::new(Shape::Class, id, view.name.clone())
        .stereotype(stereotype)
        .section(Section::plain(
            view.columns.iter().map(|c| column_line(None, c)).collect(),
        ))
        .section(Section::titled("Indexes", index_lines(&view.indexes)).divided());

    if !view.definition.trim().is_empty() {
        let mut lines = vec!["Query:".to_string()];
        lines.extend(view.definition.trim().lines().map(String::from));
        node = node.note(Note::below(lines));
    }
    node
}

pub fn diagram(db: &Database) -> Diagram {
    let mut diagram = Diagram::new(format!("Database Schema: {}", db.name));
    diagram.preamble = preamble();
    let mut ids = RelationIds::default();

    for schema in &db.schemas {
        let mut package = Container::new(&schema.name);
        for table in &schema.tables {
            let id = ids.id(&table.schema, &table.name);
            package.nodes.push(table_node(table, id));
        }
        for view in &schema.views {
            let id = ids.id(&schema.name, &view.name);
            package.nodes.push(view_node(view, "view", id));
        }
        for view in &schema.materialized_views {
            let id = ids.id(&schema.name, &view.name);
            package.nodes.push(view_node(view, "materialized", id));
        }
        diagram.push_container(package);
    }

    for table in db.schemas.iter().flat_map(|s| s.tables.iter()) {
        let from = ids.id(&table.schema, &table.name);
        for fk in &table.foreign_keys {
            diagram.edges.push(
                Edge::new(from.clone(), "--", ids.id(&fk.ref_schema, &fk.ref_table))
                    .multiplicity("*", "1")
                    .label(format!(
                        "ON DELETE {}, ON UPDATE {}",
                        fk.on_delete, fk.on_update
                    )),
            );
        }
        for parent in &table.inherits {
            let to = match parent.split_once('.') {
                Some((s, t)) => ids.id(s, t),
                None => ids.id(&table.schema, parent),
            };
            diagram
                .edges
                .push(Edge::new(from.clone(), "--|>", to).label("inherits"));
        }
    }

    diagram
}

pub fn render(db: &Database) -> String {
    plantuml::render(&diagram(db))
}

/// Markdown documentation: one section per schema with column tables,
/// foreign keys, views and functions.
pub fn markdown(db: &Database) -> String {
    let mut md = format!("# Database: {}\n\n", db.name);

    for schema in &db.schemas {
        let _ = writeln!(md, "## Schema `{}`\n", schema.name);

        for table in &schema.tables {
            let _ = writeln!(md, "### {}\n", table.name);
            if let Some(comment) = &table.comment {
                let _ = writeln!(md, "{}\n", comment);
            }
            md.push_str("| Column | Type | Nullable | Key | Default |\n");
            md.push_str("|--------|------|----------|-----|---------|\n");
            for col in &table.columns {
                let _ = writeln!(
                    md,
                    "| {} | {} | {} | {} | {} |",
                    col.name,
                    col.data_type,
                    if col.nullable { "yes" } else { "no" },
                    if col.primary_key { "PK" } else { "" },
                    col.default.as_deref().unwrap_or("")
                );
            }
            md.push('\n');

            if !table.foreign_keys.is_empty() {
                md.push_str("Foreign keys:\n");
                for fk in &table.foreign_keys {
                    let _ = writeln!(
                        md,
                        "- `{}` ({}) → {}.{} ({}) ON DELETE {} ON UPDATE {}",
                        fk.name,
                        fk.columns.join(", "),
                        fk.ref_schema,
                        fk.ref_table,
                        fk.ref_columns.join(", "),
                        fk.on_delete,
                        fk.on_update
                    );
                }
                md.push('\n');
            }
        }

        for view in schema.views.iter().chain(schema.materialized_views.iter()) {
            let _ = writeln!(md, "### {} (view)\n", view.name);
            if !view.definition.is_empty() {
                let _ = writeln!(md, "```sql\n{}\n```\n", view.definition.trim());
            }
        }

        if !schema.functions.is_empty() {
            md.push_str("### Functions\n\n");
            for func in &schema.functions {
                let args: Vec<String> = func
                    .arguments
                    .iter()
                    .map(|a| format!("{} {} {}", a.mode.as_str(), a.name, a.data_type).trim().to_string())
                    .collect();
                let _ = writeln!(
                    md,
                    "- `{}({})` → {} [{}, {}, SECURITY {}]",
                    func.name,
                    args.join(", "),
                    func.return_type,
                    func.language,
                    func.volatility.as_str(),
                    func.security.as_str()
                );
            }
            md.push('\n');
        }
    }

    md.push_str("## Diagram\n\n```plantuml\n");
    md.push_str(&render(db));
    md.push_str("```\n");
    md
}

//! Relationship inference over Go declarations and the Mermaid class diagram.

use std::collections::HashSet;

use super::{FileDoc, InterfaceDoc, ProjectDoc, StructDoc};
use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};
use crate::render::{mermaid, Diagram, Edge, Node, Section, Shape};

const BASIC_TYPES: &[&str] = &[
    "string",
    "int",
    "bool",
    "int8",
    "int16",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "byte",
    "rune",
    "error",
    "any",
    "interface{}",
];

const MAX_DIAGRAM_METHODS: usize = 5;

fn is_special_type(t: &str) -> bool {
    t.contains("regexp.Regexp")
        || t.contains("template.Template")
        || t.contains("ast.")
        || t.contains("time.")
        || t.starts_with("map[")
        || t.contains("chan")
        || t.starts_with("func")
}

/// Type a field points at, if it names a user-defined type.
///
/// Returns `(package, name)`; `package` is `None` for the current package.
pub fn related_type(field_type: &str) -> Option<(Option<&str>, &str)> {
    let t = field_type.trim_start_matches('*').trim_start_matches("[]");
    let t = t.trim_start_matches('*');
    if BASIC_TYPES.contains(&t) || is_special_type(t) {
        return None;
    }
    let t = t.split('[').next().unwrap_or(t);
    match t.split_once('.') {
        None if !t.is_empty() => Some((None, t)),
        Some((pkg, name)) if !pkg.is_empty() && !name.is_empty() && !name.contains('.') => {
            Some((Some(pkg), name))
        }
        _ => None,
    }
}

/// Short display form of a field type for class members.
pub fn display_type(t: &str) -> String {
    let t = t.trim_start_matches('*');
    if t.starts_with("[]") {
        return "Array".to_string();
    }
    if t.starts_with("map[") {
        return "Map".to_string();
    }
    if t.contains("chan") {
        return "Channel".to_string();
    }
    if t.contains("regexp.Regexp") {
        return "RegExp".to_string();
    }
    let t = t.split('[').next().unwrap_or(t);
    match t.rfind('.') {
        Some(idx) => t[idx + 1..].to_string(),
        None => t.to_string(),
    }
}

/// True when the struct has every method of a non-empty interface with an equal signature.
pub fn implements(st: &StructDoc, iface: &InterfaceDoc) -> bool {
    !iface.methods.is_empty()
        && iface.methods.iter().all(|im| {
            st.methods
                .iter()
                .any(|sm| sm.name == im.name && sm.signature == im.signature)
        })
}

fn class_name(package: &str, name: &str) -> String {
    format!("{}_{}", package, name)
}

/// Lower the project into entities and infer containment, usage and implementation edges.
pub fn build_graph(project: &ProjectDoc) -> EntityGraph {
    let mut graph = EntityGraph::new();

    for dir in &project.directories {
        let structs: Vec<&StructDoc> = dir.files.iter().flat_map(|f| f.structs.iter()).collect();
        let interfaces: Vec<&InterfaceDoc> =
            dir.files.iter().flat_map(|f| f.interfaces.iter()).collect();

        for file in &dir.files {
            lower_file(&mut graph, &dir.path, file);
        }

        for st in &structs {
            let from = EntityRef::scoped(EntityKind::Struct, &dir.path, &st.name);
            for field in &st.fields {
                if let Some((None, name)) = related_type(&field.field_type) {
                    if name != st.name && structs.iter().any(|s| s.name == name) {
                        let to = EntityRef::scoped(EntityKind::Struct, &dir.path, name);
                        graph.add_relation(&from, &to, RelationKind::Uses, Some(field.name.clone()));
                    }
                }
            }
            for iface in &interfaces {
                if implements(st, iface) {
                    let to = EntityRef::scoped(EntityKind::Interface, &dir.path, &iface.name);
                    graph.add_relation(&from, &to, RelationKind::Implements, None);
                }
            }
        }
    }

    graph
}

fn lower_file(graph: &mut EntityGraph, dir: &str, file: &FileDoc) {
    let package = EntityRef::scoped(EntityKind::Package, dir, &file.package);
    graph.ensure_entity(package.clone());

    let members = file
        .structs
        .iter()
        .map(|s| (EntityKind::Struct, &s.name, &s.doc))
        .chain(
            file.interfaces
                .iter()
                .map(|i| (EntityKind::Interface, &i.name, &i.doc)),
        )
        .chain(
            file.functions
                .iter()
                .map(|f| (EntityKind::Function, &f.name, &f.doc)),
        );

    for (kind, name, doc) in members {
        let entity = EntityRef::scoped(kind, dir, name);
        let node = EntityNode::new(entity.clone())
            .with_doc(Some(doc.clone()))
            .with_attr("file", file.file_name.clone());
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{} (keeping first declaration)", e);
            continue;
        }
        graph.add_relation(&package, &entity, RelationKind::Contains, None);
    }
}

/// Build the class diagram IR: one class per struct and interface.
pub fn class_diagram(project: &ProjectDoc) -> Diagram {
    let mut diagram = Diagram::new("Go structure");
    let mut declared = HashSet::new();
    let mut seen_edges = HashSet::new();
    let mut edges = Vec::new();

    let mut push_edge = |edge: Edge, edges: &mut Vec<Edge>| {
        let key = (edge.from.clone(), edge.arrow.clone(), edge.to.clone());
        if seen_edges.insert(key) {
            edges.push(edge);
        }
    };

    for dir in &project.directories {
        let interfaces: Vec<(&str, &InterfaceDoc)> = dir
            .files
            .iter()
            .flat_map(|f| f.interfaces.iter().map(move |i| (f.package.as_str(), i)))
            .collect();

        for file in &dir.files {
            for st in &file.structs {
                let class = class_name(&file.package, &st.name);
                if !declared.insert(class.clone()) {
                    continue;
                }

                let mut members: Vec<String> = st
                    .fields
                    .iter()
                    .map(|f| format!("+{} {}", f.name, display_type(&f.field_type)))
                    .collect();
                members.extend(
                    st.methods
                        .iter()
                        .take(MAX_DIAGRAM_METHODS)
                        .map(|m| format!("+{}()", m.name)),
                );
                diagram.nodes.push(
                    Node::new(Shape::Class, class.clone(), st.name.clone())
                        .section(Section::plain(members)),
                );

                for field in &st.fields {
                    let target = match related_type(&field.field_type) {
                        Some((None, name)) => class_name(&file.package, name),
                        Some((Some(pkg), name)) => class_name(pkg, name),
                        None => continue,
                    };
                    push_edge(Edge::new(class.clone(), "-->", target), &mut edges);
                }

                for (pkg, iface) in &interfaces {
                    if implements(st, iface) {
                        push_edge(
                            Edge::new(class.clone(), "..|>", class_name(pkg, &iface.name)),
                            &mut edges,
                        );
                    }
                }
            }

            for iface in &file.interfaces {
                let class = class_name(&file.package, &iface.name);
                if !declared.insert(class.clone()) {
                    continue;
                }
                let members: Vec<String> = iface
                    .methods
                    .iter()
                    .take(MAX_DIAGRAM_METHODS)
                    .map(|m| format!("+{}()", m.name))
                    .collect();
                diagram.nodes.push(
                    Node::new(Shape::Class, class, iface.name.clone())
                        .stereotype("interface")
                        .section(Section::plain(members)),
                );
            }
        }
    }

    diagram.edges = edges;
    diagram
}

/// Mermaid `classDiagram` text for the project.
pub fn mermaid_diagram(project: &ProjectDoc) -> String {
    mermaid::class_diagram(&class_diagram(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysers::golang::{DirectoryDoc, FieldDoc, FunctionDoc};
    use pretty_assertions::assert_eq;

    fn method(name: &str, sig: &str) -> FunctionDoc {
        FunctionDoc {
            name: name.into(),
            signature: sig.into(),
            ..Default::default()
        }
    }

    fn field(name: &str, ty: &str) -> FieldDoc {
        FieldDoc {
            name: name.into(),
            field_type: ty.into(),
            ..Default::default()
        }
    }

    fn project() -> ProjectDoc {
        let store = InterfaceDoc {
            name: "Store".into(),
            methods: vec![method("Get", "(k string) (string)")],
            ..Default::default()
        };
        let mem = StructDoc {
            name: "Memory".into(),
            fields: vec![field("data", "map[string]string"), field("cfg", "*Config")],
            methods: vec![method("Get", "(k string) (string)")],
            ..Default::default()
        };
        let cfg = StructDoc {
            name: "Config".into(),
            fields: vec![field("Timeout", "time.Duration"), field("Log", "*zap.Logger")],
            ..Default::default()
        };
        ProjectDoc {
            directories: vec![DirectoryDoc {
                path: "internal/store".into(),
                files: vec![FileDoc {
                    file_name: "internal/store/store.go".into(),
                    package: "store".into(),
                    interfaces: vec![store],
                    structs: vec![mem, cfg],
                    ..Default::default()
                }],
            }],
        }
    }

    #[test]
    fn related_type_skips_basic_and_special() {
        assert_eq!(related_type("string"), None);
        assert_eq!(related_type("[]byte"), None);
        assert_eq!(related_type("time.Time"), None);
        assert_eq!(related_type("map[string]int"), None);
        assert_eq!(related_type("*Config"), Some((None, "Config")));
        assert_eq!(related_type("[]*http.Client"), Some((Some("http"), "Client")));
    }

    #[test]
    fn implements_requires_equal_signatures() {
        let p = project();
        let file = &p.directories[0].files[0];
        assert!(implements(&file.structs[0], &file.interfaces[0]));
        assert!(!implements(&file.structs[1], &file.interfaces[0]));

        let mut other = file.structs[0].clone();
        other.methods[0].signature = "(k int) (string)".into();
        assert!(!implements(&other, &file.interfaces[0]));

        let empty = InterfaceDoc::default();
        assert!(!implements(&file.structs[0], &empty));
    }

    #[test]
    fn graph_relations() {
        let graph = build_graph(&project());
        let implements: Vec<(String, String)> = graph
            .relations_of_kind(RelationKind::Implements)
            .into_iter()
            .map(|r| (r.from.name, r.to.name))
            .collect();
        assert_eq!(implements, vec![("Memory".to_string(), "Store".to_string())]);
        let uses = graph.relations_of_kind(RelationKind::Uses);
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].to.name, "Config");
        assert_eq!(graph.relations_of_kind(RelationKind::Contains).len(), 3);
    }

    #[test]
    fn mermaid_class_diagram() {
        let out = mermaid_diagram(&project());
        let expected = "classDiagram\n    class store_Memory {\n        +data Map\n        +cfg Config\n        +Get()\n    }\n    class store_Config {\n        +Timeout Duration\n        +Log Logger\n    }\n    class store_Store {\n        <<interface>>\n        +Get()\n    }\n    store_Memory --> store_Config\n    store_Memory ..|> store_Store\n    store_Config --> zap_Logger\n";
        assert_eq!(out, expected);
    }
}

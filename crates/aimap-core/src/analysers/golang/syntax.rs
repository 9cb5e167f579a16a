//! Declaration extraction from a tree-sitter-go syntax tree.

use tree_sitter::{Node, Parser};

use super::{FieldDoc, FileDoc, FunctionDoc, InterfaceDoc, StructDoc, ValueDoc};
use crate::error::{AimapError, Result};

/// Parse one Go source file and collect its top-level declarations.
pub fn parse_file(source: &[u8], file_name: &str) -> Result<FileDoc> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| parse_error(file_name, &e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| parse_error(file_name, "parser returned no tree"))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(parse_error(file_name, "syntax error"));
    }

    let mut doc = FileDoc {
        file_name: file_name.to_string(),
        ..Default::default()
    };

    for i in 0..root.named_child_count() {
        let Some(child) = root.named_child(i) else {
            continue;
        };
        match child.kind() {
            "package_clause" => {
                if let Some(name) = get_name_by_kind(&child, "package_identifier", source) {
                    doc.package = name;
                }
            }
            "import_declaration" => collect_imports(&child, source, &mut doc.imports),
            "const_declaration" => {
                collect_values(&child, "const_spec", source, file_name, &mut doc.constants)
            }
            "var_declaration" => {
                collect_values(&child, "var_spec", source, file_name, &mut doc.variables)
            }
            "type_declaration" => collect_types(&child, source, file_name, &mut doc),
            "function_declaration" => {
                if let Some(func) = function_doc(&child, source, file_name) {
                    doc.functions.push(func);
                }
            }
            "method_declaration" => collect_method(&child, source, file_name, &mut doc),
            _ => {}
        }
    }

    Ok(doc)
}

fn parse_error(path: &str, message: &str) -> AimapError {
    AimapError::Parse {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

fn get_name_by_kind(node: &Node, target_kind: &str, source: &[u8]) -> Option<String> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == target_kind {
                return child.utf8_text(source).ok().map(|s| s.to_string());
            }
        }
    }
    None
}

fn line_of(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Contiguous comment lines directly above `node`, markers stripped.
fn leading_doc(node: &Node, source: &[u8]) -> String {
    let mut blocks = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut current = node.prev_named_sibling();

    while let Some(prev) = current {
        if prev.kind() != "comment" || prev.end_position().row + 1 != expected_row {
            break;
        }
        // A comment trailing code on the same line belongs to that code.
        if let Some(before) = prev.prev_named_sibling() {
            if before.kind() != "comment" && before.end_position().row == prev.start_position().row
            {
                break;
            }
        }
        blocks.push(comment_text(&text(&prev, source)));
        expected_row = prev.start_position().row;
        current = prev.prev_named_sibling();
    }

    blocks.reverse();
    blocks.join("\n").trim().to_string()
}

fn comment_text(raw: &str) -> String {
    if let Some(line) = raw.strip_prefix("//") {
        return line.trim().to_string();
    }
    let inner = raw
        .strip_prefix("/*")
        .and_then(|s| s.strip_suffix("*/"))
        .unwrap_or(raw);
    inner
        .lines()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<String>) {
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else {
            continue;
        };
        match child.kind() {
            "import_spec" => {
                if let Some(path) = child.child_by_field_name("path") {
                    imports.push(text(&path, source).trim_matches(['"', '`']).to_string());
                }
            }
            "import_spec_list" => collect_imports(&child, source, imports),
            _ => {}
        }
    }
}

fn collect_values(
    decl: &Node,
    spec_kind: &str,
    source: &[u8],
    file_name: &str,
    out: &mut Vec<ValueDoc>,
) {
    let doc = leading_doc(decl, source);
    let mut specs = Vec::new();
    for i in 0..decl.named_child_count() {
        let Some(child) = decl.named_child(i) else {
            continue;
        };
        if child.kind() == spec_kind {
            specs.push(child);
        } else if child.kind().ends_with("_spec_list") {
            for j in 0..child.named_child_count() {
                if let Some(spec) = child.named_child(j) {
                    if spec.kind() == spec_kind {
                        specs.push(spec);
                    }
                }
            }
        }
    }

    for spec in specs {
        let value_type = spec
            .child_by_field_name("type")
            .map(|t| type_string(&t, source))
            .unwrap_or_default();
        let mut cursor = spec.walk();
        for name in spec.children_by_field_name("name", &mut cursor) {
            out.push(ValueDoc {
                name: text(&name, source),
                value_type: value_type.clone(),
                doc: doc.clone(),
                file: file_name.to_string(),
                line: line_of(&name),
            });
        }
    }
}

fn collect_types(decl: &Node, source: &[u8], file_name: &str, doc: &mut FileDoc) {
    let decl_doc = leading_doc(decl, source);
    for i in 0..decl.named_child_count() {
        let Some(spec) = decl.named_child(i) else {
            continue;
        };
        if spec.kind() != "type_spec" {
            continue;
        }
        let (Some(name), Some(ty)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            continue;
        };
        let spec_doc = leading_doc(&spec, source);
        let type_doc = if spec_doc.is_empty() {
            decl_doc.clone()
        } else {
            spec_doc
        };

        match ty.kind() {
            "interface_type" => doc.interfaces.push(InterfaceDoc {
                name: text(&name, source),
                doc: type_doc,
                file: file_name.to_string(),
                line: line_of(&spec),
                methods: interface_methods(&ty, source, file_name),
            }),
            "struct_type" => doc.structs.push(StructDoc {
                name: text(&name, source),
                doc: type_doc,
                file: file_name.to_string(),
                line: line_of(&spec),
                fields: struct_fields(&ty, source),
                methods: Vec::new(),
            }),
            _ => {}
        }
    }
}

fn interface_methods(iface: &Node, source: &[u8], file_name: &str) -> Vec<FunctionDoc> {
    let mut methods = Vec::new();
    for i in 0..iface.named_child_count() {
        let Some(elem) = iface.named_child(i) else {
            continue;
        };
        if elem.kind() != "method_elem" && elem.kind() != "method_spec" {
            continue;
        }
        let Some(name) = elem.child_by_field_name("name") else {
            continue;
        };
        methods.push(FunctionDoc {
            name: text(&name, source),
            doc: leading_doc(&elem, source),
            signature: signature(
                elem.child_by_field_name("parameters"),
                elem.child_by_field_name("result"),
                source,
            ),
            file: file_name.to_string(),
            line: line_of(&elem),
        });
    }
    methods
}

fn struct_fields(st: &Node, source: &[u8]) -> Vec<FieldDoc> {
    let mut fields = Vec::new();
    let Some(list) = get_child_by_kind(st, "field_declaration_list") else {
        return fields;
    };

    for i in 0..list.named_child_count() {
        let Some(decl) = list.named_child(i) else {
            continue;
        };
        if decl.kind() != "field_declaration" {
            continue;
        }
        let Some(ty) = decl.child_by_field_name("type") else {
            continue;
        };
        let mut field_type = type_string(&ty, source);
        let tag = decl
            .child_by_field_name("tag")
            .map(|t| text(&t, source).trim_matches('`').to_string());
        let doc = leading_doc(&decl, source);

        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| text(&n, source))
            .collect();

        if names.is_empty() {
            // Embedded field: the type doubles as the name.
            if get_child_by_kind(&decl, "*").is_some() && !field_type.starts_with('*') {
                field_type = format!("*{}", field_type);
            }
            fields.push(FieldDoc {
                name: field_type.clone(),
                field_type,
                tag,
                doc,
            });
        } else {
            for name in names {
                fields.push(FieldDoc {
                    name,
                    field_type: field_type.clone(),
                    tag: tag.clone(),
                    doc: doc.clone(),
                });
            }
        }
    }
    fields
}

fn get_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

fn function_doc(node: &Node, source: &[u8], file_name: &str) -> Option<FunctionDoc> {
    let name = node.child_by_field_name("name")?;
    Some(FunctionDoc {
        name: text(&name, source),
        doc: leading_doc(node, source),
        signature: signature(
            node.child_by_field_name("parameters"),
            node.child_by_field_name("result"),
            source,
        ),
        file: file_name.to_string(),
        line: line_of(node),
    })
}

/// Attach a method to its receiver's struct; methods on unknown receivers are dropped.
fn collect_method(node: &Node, source: &[u8], file_name: &str, doc: &mut FileDoc) {
    let Some(receiver) = node
        .child_by_field_name("receiver")
        .and_then(|r| receiver_type_name(&r, source))
    else {
        return;
    };
    let Some(method) = function_doc(node, source, file_name) else {
        return;
    };

    match doc.structs.iter_mut().find(|s| s.name == receiver) {
        Some(st) => st.methods.push(method),
        None => log::debug!(
            "dropping method {} in {}: receiver {} not declared earlier in file",
            method.name,
            file_name,
            receiver
        ),
    }
}

fn receiver_type_name(params: &Node, source: &[u8]) -> Option<String> {
    let param = (0..params.named_child_count())
        .filter_map(|i| params.named_child(i))
        .find(|c| c.kind() == "parameter_declaration")?;
    base_type_name(&param.child_by_field_name("type")?, source)
}

fn base_type_name(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(text(node, source)),
        "pointer_type" | "parenthesized_type" => base_type_name(&node.named_child(0)?, source),
        "generic_type" => base_type_name(&node.child_by_field_name("type")?, source),
        _ => None,
    }
}

/// `(params)` or `(params) (results)`.
pub fn signature(params: Option<Node>, result: Option<Node>, source: &[u8]) -> String {
    let params = params.map(|p| field_list(&p, source)).unwrap_or_default();
    let results = match result {
        Some(r) if r.kind() == "parameter_list" => field_list(&r, source),
        Some(r) => type_string(&r, source),
        None => String::new(),
    };
    if results.is_empty() {
        format!("({})", params)
    } else {
        format!("({}) ({})", params, results)
    }
}

fn field_list(list: &Node, source: &[u8]) -> String {
    let mut parts = Vec::new();
    for i in 0..list.named_child_count() {
        let Some(param) = list.named_child(i) else {
            continue;
        };
        let variadic = match param.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let Some(ty) = param.child_by_field_name("type") else {
            continue;
        };
        let mut ty_str = type_string(&ty, source);
        if variadic {
            ty_str = format!("...{}", ty_str);
        }

        let mut cursor = param.walk();
        let names: Vec<String> = param
            .children_by_field_name("name", &mut cursor)
            .map(|n| text(&n, source))
            .collect();
        if names.is_empty() {
            parts.push(ty_str);
        } else {
            parts.push(format!("{} {}", names.join(", "), ty_str));
        }
    }
    parts.join(", ")
}

/// Deterministic rendering of a type expression, recursing on its structure.
pub fn type_string(node: &Node, source: &[u8]) -> String {
    let field = |name: &str| {
        node.child_by_field_name(name)
            .map(|n| type_string(&n, source))
            .unwrap_or_default()
    };

    match node.kind() {
        "type_identifier" | "identifier" | "field_identifier" | "package_identifier" => {
            text(node, source)
        }
        "pointer_type" => match node.named_child(0) {
            Some(inner) => format!("*{}", type_string(&inner, source)),
            None => text(node, source),
        },
        "qualified_type" => {
            let pkg = node
                .child_by_field_name("package")
                .map(|n| text(&n, source))
                .unwrap_or_default();
            let name = node
                .child_by_field_name("name")
                .map(|n| text(&n, source))
                .unwrap_or_default();
            format!("{}.{}", pkg, name)
        }
        "slice_type" | "array_type" | "implicit_length_array_type" => {
            format!("[]{}", field("element"))
        }
        "map_type" => format!("map[{}]{}", field("key"), field("value")),
        "interface_type" => "interface{}".to_string(),
        "struct_type" => "struct{}".to_string(),
        "function_type" => format!(
            "func{}",
            signature(
                node.child_by_field_name("parameters"),
                node.child_by_field_name("result"),
                source,
            )
        ),
        "channel_type" => {
            let value = field("value");
            let first = node.child(0).map(|c| c.kind()).unwrap_or_default();
            let second = node.child(1).map(|c| c.kind()).unwrap_or_default();
            if first == "<-" {
                format!("<-chan {}", value)
            } else if second == "<-" {
                format!("chan<- {}", value)
            } else {
                format!("chan {}", value)
            }
        }
        "generic_type" => {
            let base = field("type");
            let args = node
                .child_by_field_name("type_arguments")
                .map(|args| {
                    (0..args.named_child_count())
                        .filter_map(|i| args.named_child(i))
                        .map(|a| type_string(&a, source))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{}[{}]", base, args)
        }
        "parenthesized_type" => match node.named_child(0) {
            Some(inner) => type_string(&inner, source),
            None => text(node, source),
        },
        "type_elem" if node.named_child_count() == 1 => match node.named_child(0) {
            Some(inner) => type_string(&inner, source),
            None => text(node, source),
        },
        _ => text(node, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> FileDoc {
        parse_file(src.as_bytes(), "x.go").unwrap()
    }

    #[test]
    fn package_and_imports() {
        let doc = parse("package svc\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/x/log\"\n)\n\nimport \"os\"\n");
        assert_eq!(doc.package, "svc");
        assert_eq!(doc.imports, vec!["fmt", "github.com/x/log", "os"]);
    }

    #[test]
    fn grouped_constants_share_declaration_doc() {
        let doc = parse(
            "package p\n\n// Limits for the pool.\nconst (\n\tMaxConns int = 10\n\tMinConns = 1\n)\n\nvar Default, Fallback string\n",
        );
        assert_eq!(doc.constants.len(), 2);
        assert_eq!(doc.constants[0].name, "MaxConns");
        assert_eq!(doc.constants[0].value_type, "int");
        assert_eq!(doc.constants[0].doc, "Limits for the pool.");
        assert_eq!(doc.constants[1].value_type, "");
        assert_eq!(doc.constants[1].line, 6);
        let vars: Vec<&str> = doc.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(vars, vec!["Default", "Fallback"]);
        assert_eq!(doc.variables[0].value_type, "string");
    }

    #[test]
    fn struct_fields_tags_and_embedding() {
        let doc = parse(
            "package p\n\n// Server serves.\n// It is safe for concurrent use.\ntype Server struct {\n\t*Base\n\tio.Reader\n\t// Addr to listen on.\n\tAddr, Host string `json:\"addr\"`\n\thandlers map[string][]func(ctx context.Context) error\n}\n",
        );
        let st = &doc.structs[0];
        assert_eq!(st.name, "Server");
        assert_eq!(st.doc, "Server serves.\nIt is safe for concurrent use.");
        assert_eq!(st.line, 5);
        let fields: Vec<(&str, &str)> = st
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("*Base", "*Base"),
                ("io.Reader", "io.Reader"),
                ("Addr", "string"),
                ("Host", "string"),
                ("handlers", "map[string][]func(ctx context.Context) (error)"),
            ]
        );
        assert_eq!(st.fields[2].tag.as_deref(), Some("json:\"addr\""));
        assert_eq!(st.fields[2].doc, "Addr to listen on.");
        assert_eq!(st.fields[0].tag, None);
    }

    #[test]
    fn interface_method_signatures() {
        let doc = parse(
            "package p\n\ntype Store interface {\n\t// Get a value.\n\tGet(ctx context.Context, key string) ([]byte, error)\n\tWatch(keys ...string) <-chan Event\n\tSend(out chan<- int, in chan string)\n}\n",
        );
        let iface = &doc.interfaces[0];
        assert_eq!(iface.name, "Store");
        let sigs: Vec<(&str, &str)> = iface
            .methods
            .iter()
            .map(|m| (m.name.as_str(), m.signature.as_str()))
            .collect();
        assert_eq!(
            sigs,
            vec![
                ("Get", "(ctx context.Context, key string) ([]byte, error)"),
                ("Watch", "(keys ...string) (<-chan Event)"),
                ("Send", "(out chan<- int, in chan string)"),
            ]
        );
        assert_eq!(iface.methods[0].doc, "Get a value.");
    }

    #[test]
    fn methods_attach_to_known_receivers() {
        let doc = parse(
            "package p\n\ntype Cache struct{}\n\n// Get returns a value.\nfunc (c *Cache) Get(k string) string { return k }\n\nfunc (c Cache) Len() int { return 0 }\n\nfunc (o *Other) Skip() {}\n\nfunc New() *Cache { return nil }\n",
        );
        let methods: Vec<&str> = doc.structs[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["Get", "Len"]);
        assert_eq!(doc.structs[0].methods[0].doc, "Get returns a value.");
        assert_eq!(doc.structs[0].methods[0].signature, "(k string) (string)");
        let funcs: Vec<&str> = doc.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(funcs, vec!["New"]);
        assert_eq!(doc.functions[0].signature, "() (*Cache)");
    }

    #[test]
    fn method_on_generic_receiver_uses_base_name() {
        let doc = parse(
            "package p\n\ntype List[T any] struct{ items []T }\n\nfunc (l *List[T]) Push(v T) {}\n",
        );
        assert_eq!(doc.structs[0].methods.len(), 1);
        assert_eq!(doc.structs[0].fields[0].field_type, "[]T");
    }

    #[test]
    fn trailing_comment_is_not_a_doc() {
        let doc = parse("package p\n\nvar a int // counter\nvar b int\n");
        assert_eq!(doc.variables[1].doc, "");
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = parse_file(b"package p\n\nfunc {\n", "bad.go").unwrap_err();
        assert!(matches!(err, AimapError::Parse { .. }));
    }
}

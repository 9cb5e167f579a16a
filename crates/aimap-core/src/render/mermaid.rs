//! Mermaid serialisers for [`Diagram`]: flowcharts and class diagrams.

use std::fmt::Write;

use super::diagram::{Container, Diagram, Node};
use super::single_line;

fn flatten<'a>(containers: &'a [Container], out: &mut Vec<&'a Node>) {
    for c in containers {
        for n in &c.nodes {
            out.push(n);
        }
        flatten(&c.containers, out);
    }
}

fn all_nodes(diagram: &Diagram) -> Vec<&Node> {
    let mut nodes = Vec::new();
    flatten(&diagram.containers, &mut nodes);
    nodes.extend(diagram.nodes.iter());
    nodes
}

/// Bracketed node text, quoted only when it would break the grammar.
fn node_text(label: &str) -> String {
    let label = single_line(label);
    if label.contains(['[', ']', '(', ')', '{', '}', '"', '|']) {
        format!("[\"{}\"]", label.replace('"', "#quot;"))
    } else {
        format!("[{}]", label)
    }
}

/// `graph <direction>` flowchart; node styles come from [`Node::style`].
pub fn flowchart(diagram: &Diagram, direction: &str) -> String {
    let mut out = format!("graph {}\n", direction);
    for node in all_nodes(diagram) {
        let _ = writeln!(out, "    {}{}", node.id, node_text(&node.label));
        if let Some(style) = &node.style {
            let _ = writeln!(out, "    style {} {}", node.id, style);
        }
    }
    for edge in &diagram.edges {
        match &edge.label {
            Some(label) => {
                let _ = writeln!(
                    out,
                    "    {} {}|{}| {}",
                    edge.from,
                    edge.arrow,
                    single_line(label),
                    edge.to
                );
            }
            None => {
                let _ = writeln!(out, "    {} {} {}", edge.from, edge.arrow, edge.to);
            }
        }
    }
    out
}

/// `classDiagram` with one class per node; section lines become members.
pub fn class_diagram(diagram: &Diagram) -> String {
    let mut out = String::from("classDiagram\n");
    for node in all_nodes(diagram) {
        let members: Vec<&String> = node.sections.iter().flat_map(|s| s.lines.iter()).collect();
        if members.is_empty() {
            let _ = writeln!(out, "    class {}", node.id);
            continue;
        }
        let _ = writeln!(out, "    class {} {{", node.id);
        if let Some(stereotype) = &node.stereotype {
            let _ = writeln!(out, "        <<{}>>", stereotype);
        }
        for member in members {
            let _ = writeln!(out, "        {}", single_line(member));
        }
        out.push_str("    }\n");
    }
    for edge in &diagram.edges {
        let _ = write!(out, "    {} {} {}", edge.from, edge.arrow, edge.to);
        if let Some(label) = &edge.label {
            let _ = write!(out, " : {}", single_line(label));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::diagram::{Edge, Section, Shape};
    use pretty_assertions::assert_eq;

    #[test]
    fn flowchart_nodes_styles_edges() {
        let mut d = Diagram::new("k8s");
        d.nodes.push(
            Node::new(Shape::Component, "web", "Service: web").style("fill:#ddf,stroke:#33a"),
        );
        d.nodes.push(Node::new(Shape::Component, "api", "Deployment: api"));
        d.edges.push(Edge::new("web", "-->", "api"));
        assert_eq!(
            flowchart(&d, "TD"),
            "graph TD\n    web[Service: web]\n    style web fill:#ddf,stroke:#33a\n    api[Deployment: api]\n    web --> api\n"
        );
    }

    #[test]
    fn flowchart_quotes_awkward_labels() {
        let mut d = Diagram::new("t");
        d.nodes.push(Node::new(Shape::Component, "p", "Page: /blog/[slug]"));
        assert!(flowchart(&d, "LR").contains("p[\"Page: /blog/[slug]\"]"));
    }

    #[test]
    fn line_breaks_stay_inside_the_node() {
        let mut d = Diagram::new("t");
        d.nodes.push(Node::new(Shape::Component, "n", "two\nlines"));
        d.edges.push(Edge::new("n", "-->", "n").label("a\nb"));
        assert_eq!(
            flowchart(&d, "TD"),
            "graph TD\n    n[two\\nlines]\n    n -->|a\\nb| n\n"
        );
    }

    #[test]
    fn class_diagram_members_and_relations() {
        let mut d = Diagram::new("go");
        d.nodes.push(
            Node::new(Shape::Class, "svc_Server", "Server")
                .section(Section::plain(vec!["+addr string".into(), "+Run()".into()])),
        );
        d.nodes.push(Node::new(Shape::Class, "svc_Config", "Config"));
        d.edges.push(Edge::new("svc_Server", "-->", "svc_Config"));
        assert_eq!(
            class_diagram(&d),
            "classDiagram\n    class svc_Server {\n        +addr string\n        +Run()\n    }\n    class svc_Config\n    svc_Server --> svc_Config\n"
        );
    }
}

//! PlantUML serialiser for [`Diagram`].

use std::fmt::Write;

use super::diagram::{Container, Diagram, Edge, Node};
use super::{escape, single_line};

/// Serialise a diagram as a complete `@startuml` ... `@enduml` document.
pub fn render(diagram: &Diagram) -> String {
    let mut out = String::from("@startuml\n\n");

    if !diagram.preamble.is_empty() {
        for line in &diagram.preamble {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    let _ = writeln!(out, "title {}\n", diagram.title);

    for container in &diagram.containers {
        write_container(&mut out, container, 0);
        out.push('\n');
    }

    for node in &diagram.nodes {
        write_node(&mut out, node, 0);
    }

    for edge in &diagram.edges {
        write_edge(&mut out, edge);
    }

    out.push_str("@enduml\n");
    out
}

fn write_container(out: &mut String, container: &Container, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{}package \"{}\" {{", pad, escape(&container.name));
    for node in &container.nodes {
        write_node(out, node, depth);
    }
    for child in &container.containers {
        write_container(out, child, depth + 1);
    }
    let _ = writeln!(out, "{}}}", pad);
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = write!(
        out,
        "{}{} \"{}\" as {}",
        pad,
        node.shape.as_str(),
        escape(&node.label),
        node.id
    );
    if let Some(stereotype) = &node.stereotype {
        let _ = write!(out, " <<{}>>", stereotype);
    }
    out.push_str(" {\n");

    for section in &node.sections {
        if section.divider {
            let _ = writeln!(out, "{}  --", pad);
        }
        if let Some(title) = &section.title {
            let _ = writeln!(out, "{}  .. {} ..", pad, single_line(title));
        }
        for line in &section.lines {
            let _ = writeln!(out, "{}  {}", pad, single_line(line));
        }
    }

    for (i, note) in node.notes.iter().filter(|n| !n.detached).enumerate() {
        let text: Vec<String> = note.lines.iter().map(|l| escape(l)).collect();
        let _ = writeln!(
            out,
            "{}  note \"{}\" as N_{}_{}",
            pad,
            text.join("\\n"),
            node.id,
            i + 1
        );
    }

    for child in &node.children {
        write_node(out, child, depth + 1);
    }

    let _ = writeln!(out, "{}}}", pad);

    for note in node.notes.iter().filter(|n| n.detached) {
        let _ = writeln!(out, "{}note bottom of {}", pad, node.id);
        for line in &note.lines {
            let _ = writeln!(out, "{}{}", pad, single_line(line));
        }
        let _ = writeln!(out, "{}end note", pad);
    }
}

fn write_edge(out: &mut String, edge: &Edge) {
    out.push_str(&edge.from);
    if let Some(m) = &edge.from_mult {
        let _ = write!(out, " \"{}\"", m);
    }
    let _ = write!(out, " {}", edge.arrow);
    if let Some(m) = &edge.to_mult {
        let _ = write!(out, " \"{}\"", m);
    }
    let _ = write!(out, " {}", edge.to);
    if let Some(label) = &edge.label {
        let _ = write!(out, " : {}", single_line(label));
    }
    out.push('\n');
    if let Some(note) = &edge.note {
        let _ = writeln!(out, "note on link\n  {}\nend note", single_line(note));
    }
}

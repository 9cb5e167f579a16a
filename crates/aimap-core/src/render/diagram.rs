//! Format-neutral diagram IR: title, containers, nodes with sections, edges.

/// Node shape keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Component,
    Class,
    Entity,
    Database,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Class => "class",
            Self::Entity => "entity",
            Self::Database => "database",
        }
    }
}

/// A labelled group of attribute lines inside a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub title: Option<String>,
    /// Draw a separator line before this section.
    pub divider: bool,
    pub lines: Vec<String>,
}

impl Section {
    pub fn plain(lines: Vec<String>) -> Self {
        Self {
            title: None,
            divider: false,
            lines,
        }
    }

    pub fn titled(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: Some(title.into()),
            divider: false,
            lines,
        }
    }

    pub fn divided(mut self) -> Self {
        self.divider = true;
        self
    }
}

/// Free-text note. `lines` hold raw text; serialisers escape them.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub lines: Vec<String>,
    /// Attached below the node instead of embedded in it.
    pub detached: bool,
}

impl Note {
    pub fn inline(lines: Vec<String>) -> Self {
        Self {
            lines,
            detached: false,
        }
    }

    pub fn below(lines: Vec<String>) -> Self {
        Self {
            lines,
            detached: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub shape: Shape,
    pub id: String,
    pub label: String,
    pub stereotype: Option<String>,
    /// Extra style hint (Mermaid fill/stroke).
    pub style: Option<String>,
    pub sections: Vec<Section>,
    pub notes: Vec<Note>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(shape: Shape, id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            shape,
            id: id.into(),
            label: label.into(),
            stereotype: None,
            style: None,
            sections: Vec::new(),
            notes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotype = Some(stereotype.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Append a section, skipping it when it has no lines.
    pub fn section(mut self, section: Section) -> Self {
        if !section.lines.is_empty() {
            self.sections.push(section);
        }
        self
    }

    pub fn note(mut self, note: Note) -> Self {
        if !note.lines.is_empty() {
            self.notes.push(note);
        }
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    pub nodes: Vec<Node>,
    pub containers: Vec<Container>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            containers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.containers.iter().all(|c| c.is_empty())
    }
}

/// Directed edge `from ARROW to : label`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub arrow: String,
    pub from_mult: Option<String>,
    pub to_mult: Option<String>,
    pub label: Option<String>,
    /// Note attached to the link itself.
    pub note: Option<String>,
}

impl Edge {
    pub fn new(from: impl Into<String>, arrow: &str, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            arrow: arrow.to_string(),
            from_mult: None,
            to_mult: None,
            label: None,
            note: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn multiplicity(mut self, from: &str, to: &str) -> Self {
        self.from_mult = Some(from.to_string());
        self.to_mult = Some(to.to_string());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub title: String,
    /// Preamble directives emitted before the title.
    pub preamble: Vec<String>,
    pub containers: Vec<Container>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Add a container unless it ended up empty.
    pub fn push_container(&mut self, container: Container) {
        if !container.is_empty() {
            self.containers.push(container);
        }
    }
}

/// Standard PlantUML preamble shared by the project diagrams.
pub fn standard_preamble(element: &str) -> Vec<String> {
    vec![
        "!theme plain".to_string(),
        "skinparam linetype ortho".to_string(),
        "skinparam roundcorner 5".to_string(),
        "skinparam shadowing false".to_string(),
        format!("skinparam {} {{", element),
        "  BackgroundColor White".to_string(),
        "  ArrowColor Gray".to_string(),
        "  BorderColor Gray".to_string(),
        "}".to_string(),
    ]
}

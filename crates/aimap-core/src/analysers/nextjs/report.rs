//! Class diagram and Markdown summary of a Next.js project.

use std::fmt::Write;

use super::{Api, Component, Layout, NextjsProject, Page, StateLibrary, StateModule};
use crate::render::{
    plantuml, standard_preamble, Container, Diagram, Edge, Node, Section, Shape, UniqueIds,
};

/// Node identifiers keyed by element kind and its source name.
#[derive(Default)]
struct NodeIds {
    ids: UniqueIds,
}

impl NodeIds {
    fn allocate(&mut self, kind: &str, key: &str, base: &str) -> String {
        self.ids.id_for(&format!("{}:{}", kind, key), base)
    }

    fn component(&mut self, name: &str) -> String {
        self.allocate("component", name, &format!("component_{}", name))
    }

    fn page(&mut self, page: &Page) -> String {
        self.allocate("page", &page.path, &page.path)
    }

    fn layout(&mut self, path: &str) -> String {
        self.allocate("layout", path, path)
    }

    fn state(&mut self, path: &str) -> String {
        self.allocate("state", path, path)
    }

    fn api(&mut self, route: &str) -> String {
        self.allocate("api", route, &format!("api_{}", route))
    }

    fn lookup(&self, kind: &str, key: &str) -> Option<String> {
        self.ids
            .lookup(&format!("{}:{}", kind, key))
            .map(String::from)
    }
}

fn component_node(component: &Component, id: String) -> Node {
    let icon = if component.server {
        "S"
    } else if component.client {
        "B"
    } else {
        "C"
    };
    Node::new(Shape::Class, id, component.name.clone())
        .stereotype(format!("({},#ADD1B2) component", icon))
        .section(Section::titled(
            "props",
            component
                .props
                .iter()
                .map(|p| format!("{}{}: {}", if p.required { "*" } else { "" }, p.name, p.prop_type))
                .collect(),
        ))
        .section(Section::titled(
            "hooks",
            component
                .hooks
                .iter()
                .map(|h| format!("{}({})", h.name, h.dependencies.join(", ")))
                .collect(),
        ))
}

fn page_node(page: &Page, id: String) -> Node {
    let icon = if page.is_dynamic() { "D" } else { "S" };
    Node::new(Shape::Class, id, page.route.clone())
        .stereotype(format!("({},#87CEFA) page", icon))
        .section(Section::titled(
            "params",
            page.params
                .iter()
                .map(|p| {
                    let marker = if p.optional { "" } else { "*" };
                    let suffix = if p.catch_all { "[]" } else { "" };
                    format!("{}{}: string{}", marker, p.name, suffix)
                })
                .collect(),
        ))
        .section(Section::titled(
            "components",
            page.components.iter().map(|c| format!("+ {}", c)).collect(),
        ))
        .section(Section::titled(
            "apis",
            page.apis.iter().map(|a| format!("# {}", a)).collect(),
        ))
}

fn layout_node(layout: &Layout, id: String) -> Node {
    Node::new(Shape::Class, id, layout.name.clone())
        .stereotype(format!(
            "({},#B0C4DE) layout",
            if layout.root { "R" } else { "L" }
        ))
        .section(Section::plain(vec![format!("route: {}", layout.route)]))
        .section(Section::titled(
            "components",
            layout.components.iter().map(|c| format!("+ {}", c)).collect(),
        ))
}

fn state_node(module: &StateModule, id: String) -> Node {
    let icon = match module.library {
        StateLibrary::Redux => "R",
        StateLibrary::Zustand => "Z",
        StateLibrary::Jotai => "J",
        StateLibrary::Custom => "S",
    };
    Node::new(Shape::Class, id, module.name.clone())
        .stereotype(format!("({},#FFB6C1) state", icon))
        .section(Section::titled(
            "actions",
            module.actions.iter().map(|a| format!("+ {}()", a.name)).collect(),
        ))
        .section(Section::titled(
            "slices",
            module.slices.iter().map(|s| format!("# {}", s)).collect(),
        ))
        .section(Section::titled(
            "atoms",
            module
                .atoms
                .iter()
                .map(|a| match &a.default {
                    Some(d) => format!("* {} = {}", a.name, d),
                    None => format!("* {}", a.name),
                })
                .collect(),
        ))
}

fn api_node(api: &Api, id: String) -> Node {
    let mut lines = vec![format!("{} {}", api.methods.join("|"), api.route)];
    if let Some(handler) = &api.handler {
        lines.push(format!("handler: {}", handler));
    }
    Node::new(Shape::Class, id, api.route.clone())
        .stereotype("(A,#98FB98) api")
        .section(Section::plain(lines))
        .section(Section::titled(
            "middleware",
            api.middleware.iter().map(|m| format!("# {}", m)).collect(),
        ))
}

pub fn diagram(project: &NextjsProject) -> Diagram {
    let mut diagram = Diagram::new(format!("Next.js Project: {}", project.name));
    diagram.preamble = standard_preamble("class");

    let mut ids = NodeIds::default();
    let groups: [(&str, Vec<Node>); 5] = [
        (
            "Components",
            project
                .components
                .iter()
                .map(|c| component_node(c, ids.component(&c.name)))
                .collect(),
        ),
        (
            "Pages",
            project.pages.iter().map(|p| page_node(p, ids.page(p))).collect(),
        ),
        (
            "Layouts",
            project
                .layouts
                .iter()
                .map(|l| layout_node(l, ids.layout(&l.path)))
                .collect(),
        ),
        (
            "State",
            project
                .state_modules
                .iter()
                .map(|m| state_node(m, ids.state(&m.path)))
                .collect(),
        ),
        (
            "APIs",
            project.apis.iter().map(|a| api_node(a, ids.api(&a.route))).collect(),
        ),
    ];
    for (name, nodes) in groups {
        let mut container = Container::new(name);
        container.nodes = nodes;
        diagram.push_container(container);
    }

    // Only targets that were declared above get an edge.
    for page in &project.pages {
        let Some(from) = ids.lookup("page", &page.path) else {
            continue;
        };
        if let Some(to) = page.layout.as_ref().and_then(|l| ids.lookup("layout", l)) {
            diagram
                .edges
                .push(Edge::new(&from, "..>", to).label("uses layout"));
        }
        for to in page.components.iter().filter_map(|c| ids.lookup("component", c)) {
            diagram.edges.push(Edge::new(&from, "..>", to).label("uses"));
        }
        for url in &page.apis {
            let api = project.apis.iter().find(|a| a.matches(url));
            if let Some(to) = api.and_then(|a| ids.lookup("api", &a.route)) {
                diagram.edges.push(Edge::new(&from, "..>", to).label("calls"));
            }
        }
    }
    for component in &project.components {
        let Some(from) = ids.lookup("component", &component.name) else {
            continue;
        };
        for name in component.imports.iter().filter(|n| **n != component.name) {
            if let Some(to) = ids.lookup("component", name) {
                diagram.edges.push(Edge::new(&from, "..>", to).label("uses"));
            }
        }
    }
    diagram
}

pub fn render(project: &NextjsProject) -> String {
    plantuml::render(&diagram(project))
}

pub fn markdown(project: &NextjsProject) -> String {
    let mut md = format!("# Next.js Project: {}\n\n", project.name);

    if !project.pages.is_empty() {
        md.push_str("## Pages\n\n| Route | File | Components |\n|-------|------|------------|\n");
        for page in &project.pages {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                page.route,
                page.path,
                page.components.join(", ")
            );
        }
        md.push('\n');
    }

    if !project.components.is_empty() {
        md.push_str("## Components\n\n");
        for component in &project.components {
            let props: Vec<&str> = component.props.iter().map(|p| p.name.as_str()).collect();
            let _ = writeln!(
                md,
                "- **{}** (`{}`){}",
                component.name,
                component.path,
                if props.is_empty() {
                    String::new()
                } else {
                    format!(": {}", props.join(", "))
                }
            );
        }
        md.push('\n');
    }

    if !project.apis.is_empty() {
        md.push_str("## API Routes\n\n");
        for api in &project.apis {
            let _ = writeln!(md, "- `{} {}` ({})", api.methods.join("|"), api.route, api.path);
        }
        md.push('\n');
    }

    if !project.state_modules.is_empty() {
        md.push_str("## State\n\n");
        for module in &project.state_modules {
            let _ = writeln!(md, "- **{}** [{}]", module.name, module.library.as_str());
        }
        md.push('\n');
    }

    md.push_str("## Diagram\n\n```plantuml\n");
    md.push_str(&render(project));
    md.push_str("```\n");
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysers::nextjs::{Prop, RouteParam};

    fn project() -> NextjsProject {
        NextjsProject {
            name: "web".into(),
            components: vec![Component {
                name: "Card".into(),
                path: "components/Card.tsx".into(),
                client: true,
                props: vec![Prop {
                    name: "title".into(),
                    prop_type: "string".into(),
                    required: true,
                }],
                ..Default::default()
            }],
            pages: vec![Page {
                route: "/posts/[id]".into(),
                path: "app/posts/[id]/page.tsx".into(),
                params: vec![RouteParam {
                    name: "id".into(),
                    catch_all: false,
                    optional: false,
                }],
                components: vec!["Card".into(), "Unknown".into()],
                apis: vec!["/api/posts".into()],
                ..Default::default()
            }],
            apis: vec![Api {
                route: "/api/posts".into(),
                path: "app/api/posts/route.ts".into(),
                methods: vec!["GET".into()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn nodes_and_filtered_edges() {
        let out = render(&project());
        assert!(out.contains("title Next.js Project: web"));
        assert!(out.contains(
            "class \"Card\" as component_Card <<(B,#ADD1B2) component>> {\n  .. props ..\n  *title: string\n}\n"
        ));
        assert!(out.contains("class \"/posts/[id]\" as app_posts__id__page_tsx <<(D,#87CEFA) page>>"));
        assert!(out.contains("app_posts__id__page_tsx ..> component_Card : uses\n"));
        assert!(out.contains("app_posts__id__page_tsx ..> api__api_posts : calls\n"));
        assert!(!out.contains("component_Unknown"));
        assert!(!out.contains("package \"State\""));
    }

    #[test]
    fn look_alike_paths_get_distinct_ids() {
        let mut project = project();
        project.state_modules = vec![
            StateModule::new("cart", "store/cart.ts", StateLibrary::Zustand),
            StateModule::new("cart", "store-cart.ts", StateLibrary::Zustand),
        ];
        let out = render(&project);
        assert!(out.contains("class \"cart\" as store_cart_ts <<(Z,#FFB6C1) state>>"));
        assert!(out.contains("class \"cart\" as store_cart_ts_2 <<(Z,#FFB6C1) state>>"));
    }

    #[test]
    fn markdown_sections() {
        let md = markdown(&project());
        assert!(md.contains("| /posts/[id] | app/posts/[id]/page.tsx | Card, Unknown |"));
        assert!(md.contains("- `GET /api/posts` (app/api/posts/route.ts)"));
    }
}

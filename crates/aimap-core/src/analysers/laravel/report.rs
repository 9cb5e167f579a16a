//! Class diagram and Markdown summary of a Laravel project.

use std::fmt::Write;

use super::{controlled_models, Controller, LaravelProject, Model, RelationshipType, Route};
use crate::render::{
    plantuml, standard_preamble, Container, Diagram, Edge, Node, Section, Shape, UniqueIds,
};

fn class_id(ids: &mut UniqueIds, kind: &str, name: &str) -> String {
    ids.id_for(&format!("{}:{}", kind, name), name)
}

fn model_node(model: &Model, id: String) -> Node {
    let mut node = Node::new(Shape::Class, id, model.name.clone());
    if let Some(table) = &model.table {
        node = node.section(Section::plain(vec![format!(".. table: {} ..", table)]));
    }
    node.section(Section::titled(
        "fillable",
        model.fillable.iter().map(|f| format!("+ {}", f)).collect(),
    ))
    .section(Section::titled(
        "hidden",
        model.hidden.iter().map(|f| format!("- {}", f)).collect(),
    ))
    .section(Section::titled(
        "casts",
        model
            .casts
            .iter()
            .map(|c| format!("# {} : {}", c.field, c.cast_type))
            .collect(),
    ))
    .section(Section::titled(
        "relationships",
        model
            .relationships
            .iter()
            .map(|r| format!("* {}() : {}", r.method, r.kind.as_str()))
            .collect(),
    ))
}

fn controller_node(controller: &Controller, id: String) -> Node {
    let methods = controller
        .methods
        .iter()
        .map(|m| {
            format!(
                "+ {}({}) : {}",
                m.name,
                m.parameters.join(", "),
                m.return_type.as_deref().unwrap_or("mixed")
            )
        })
        .collect();
    Node::new(Shape::Class, id, controller.name.clone())
        .stereotype("(C,#ADD1B2) controller")
        .section(Section::plain(methods))
        .section(Section::titled(
            "middleware",
            controller.middleware.iter().map(|m| format!("# {}", m)).collect(),
        ))
}

fn route_node(route: &Route, id: String) -> Node {
    let mut lines = vec![route.label()];
    if let (Some(controller), Some(action)) = (&route.controller, &route.action) {
        lines.push(format!("action: {}@{}", controller, action));
    }
    if let Some(name) = &route.name {
        lines.push(format!("name: {}", name));
    }
    Node::new(Shape::Class, id, route.uri.clone())
        .stereotype("(R,#FFA07A) route")
        .section(Section::plain(lines))
        .section(Section::titled(
            "middleware",
            route.middleware.iter().map(|m| format!("# {}", m)).collect(),
        ))
}

pub fn diagram(project: &LaravelProject) -> Diagram {
    let mut diagram = Diagram::new(format!("Laravel Project: {}", project.name));
    diagram.preamble = standard_preamble("class");

    let mut ids = UniqueIds::new();

    let mut models = Container::new("Models");
    for model in &project.models {
        let id = class_id(&mut ids, "model", &model.name);
        models.nodes.push(model_node(model, id));
    }
    diagram.push_container(models);

    let mut controllers = Container::new("Controllers");
    for controller in &project.controllers {
        let id = class_id(&mut ids, "controller", &controller.name);
        controllers.nodes.push(controller_node(controller, id));
    }
    diagram.push_container(controllers);

    let mut middleware = Container::new("Middleware");
    for mw in &project.middleware {
        middleware.nodes.push(
            Node::new(Shape::Class, class_id(&mut ids, "middleware", &mw.name), mw.name.clone())
                .stereotype("(M,#B4A7E5) middleware"),
        );
    }
    diagram.push_container(middleware);

    let mut providers = Container::new("Providers");
    for provider in &project.providers {
        let mut lines = vec![format!(
            "type: {}",
            provider.parent.as_deref().unwrap_or("ServiceProvider")
        )];
        if provider.deferred {
            lines.push("deferred: true".to_string());
        }
        providers.nodes.push(
            Node::new(
                Shape::Class,
                class_id(&mut ids, "provider", &provider.name),
                provider.name.clone(),
            )
                .stereotype("(P,#85BBF0) provider")
                .section(Section::plain(lines)),
        );
    }
    diagram.push_container(providers);

    for model in &project.models {
        let from = class_id(&mut ids, "model", &model.name);
        for rel in &model.relationships {
            let to = class_id(&mut ids, "model", &rel.related_model);
            let edge = match rel.kind {
                RelationshipType::HasOne => Edge::new(&from, "-->", to).multiplicity("1", "1"),
                RelationshipType::HasMany => Edge::new(&from, "-->", to).multiplicity("1", "*"),
                RelationshipType::BelongsTo => Edge::new(&from, "<--", to).multiplicity("1", "1"),
                RelationshipType::BelongsToMany => {
                    let edge = Edge::new(&from, "<-->", to).multiplicity("*", "*");
                    match &rel.pivot_table {
                        Some(pivot) => edge.note(format!("pivot: {}", pivot)),
                        None => edge,
                    }
                }
            };
            diagram.edges.push(edge.label(rel.method.clone()));
        }
    }

    for controller in &project.controllers {
        let from = class_id(&mut ids, "controller", &controller.name);
        for model in controlled_models(controller, &project.models) {
            let to = class_id(&mut ids, "model", model);
            diagram
                .edges
                .push(Edge::new(&from, "..>", to).label("controls"));
        }
    }

    let mut routes = Container::new("Routes");
    for route in &project.routes {
        let id = ids.fresh(&format!("route_{}", route.uri));
        if let Some(controller) = &route.controller {
            let to = class_id(&mut ids, "controller", controller);
            let mut edge = Edge::new(&id, "..>", to);
            if let Some(action) = &route.action {
                edge = edge.label(action.clone());
            }
            diagram.edges.push(edge);
        }
        routes.nodes.push(route_node(route, id));
    }
    diagram.push_container(routes);

    diagram
}

pub fn render(project: &LaravelProject) -> String {
    plantuml::render(&diagram(project))
}

pub fn markdown(project: &LaravelProject) -> String {
    let mut md = format!("# Laravel Project: {}\n\n", project.name);

    if !project.models.is_empty() {
        md.push_str("## Models\n\n");
        for model in &project.models {
            let _ = writeln!(
                md,
                "### {}\n\nTable: `{}`\n",
                model.name,
                model.table.as_deref().unwrap_or("(convention)")
            );
            if !model.fillable.is_empty() {
                let _ = writeln!(md, "Fillable: {}\n", model.fillable.join(", "));
            }
            for rel in &model.relationships {
                let _ = writeln!(
                    md,
                    "- `{}()` {} {}",
                    rel.method,
                    rel.kind.as_str(),
                    rel.related_model
                );
            }
            if !model.relationships.is_empty() {
                md.push('\n');
            }
        }
    }

    if !project.controllers.is_empty() {
        md.push_str("## Controllers\n\n");
        for controller in &project.controllers {
            let methods: Vec<&str> = controller.methods.iter().map(|m| m.name.as_str()).collect();
            let _ = writeln!(md, "- **{}**: {}", controller.name, methods.join(", "));
        }
        md.push('\n');
    }

    if !project.routes.is_empty() {
        md.push_str("## Routes\n\n| Method | URI | Action | Name |\n|--------|-----|--------|------|\n");
        for route in &project.routes {
            let action = match (&route.controller, &route.action) {
                (Some(c), Some(a)) => format!("{}@{}", c, a),
                _ => String::new(),
            };
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                route.method,
                route.uri,
                action,
                route.name.as_deref().unwrap_or("")
            );
        }
        md.push('\n');
    }

    if !project.migrations.is_empty() {
        md.push_str("## Migrations\n\n");
        for migration in &project.migrations {
            let columns: Vec<&str> = migration.columns.iter().map(|c| c.name.as_str()).collect();
            let _ = writeln!(
                md,
                "- `{}` ({}): {}",
                migration.name,
                migration.table,
                columns.join(", ")
            );
        }
        md.push('\n');
    }

    md.push_str("## Diagram\n\n```plantuml\n");
    md.push_str(&render(project));
    md.push_str("```\n");
    md
}

//! PlantUML component diagram for a Docker project.

use std::fmt::Write;

use super::{Compose, DockerProject, Dockerfile};
use crate::render::{plantuml, sanitize_id, Container, Diagram, Edge, Node, Note, Shape, UniqueIds};

pub fn diagram(project: &DockerProject) -> Diagram {
    let mut diagram = Diagram::new(format!("Docker Project: {}", project.name));
    diagram.preamble = vec![
        "!theme plain".to_string(),
        "skinparam linetype ortho".to_string(),
        "skinparam roundcorner 5".to_string(),
        "skinparam component {".to_string(),
        "  BackgroundColor White".to_string(),
        "  ArrowColor Gray".to_string(),
        "  BorderColor Gray".to_string(),
        "}".to_string(),
    ];
    let mut ids = UniqueIds::new();

    let mut files = Container::new("Dockerfiles");
    for df in &project.dockerfiles {
        files.nodes.push(dockerfile_node(df, &mut ids));
    }
    diagram.push_container(files);

    if let Some(compose) = &project.compose {
        compose_section(&mut diagram, compose, &mut ids);
    }
    diagram
}

pub fn render(project: &DockerProject) -> String {
    plantuml::render(&diagram(project))
}

/// Dockerfile and compose summary followed by the component diagram.
pub fn markdown(project: &DockerProject) -> String {
    let mut md = format!("# Docker Project: {}\n\n", project.name);

    for df in &project.dockerfiles {
        let _ = writeln!(md, "## {}\n", df.path);
        let _ = writeln!(md, "- Base image: `{}`", df.base_image);
        if df.stages.len() > 1 {
            let stages: Vec<String> = df.stages.iter().map(|s| s.display_name()).collect();
            let _ = writeln!(md, "- Stages: {}", stages.join(", "));
        }
        if !df.exposed_ports.is_empty() {
            let _ = writeln!(md, "- Exposed ports: {}", df.exposed_ports.join(", "));
        }
        for cmd in &df.commands {
            let _ = writeln!(md, "- {}: `{}`", cmd.kind, cmd.command);
        }
        md.push('\n');
    }

    if let Some(compose) = &project.compose {
        md.push_str("## Compose Services\n\n| Service | Image | Ports | Depends on |\n|---------|-------|-------|------------|\n");
        for svc in &compose.services {
            let image = match (&svc.image, &svc.build) {
                (Some(image), _) => image.clone(),
                (None, Some(build)) => format!("build: {}", build.context),
                (None, None) => String::new(),
            };
            let ports: Vec<String> = svc.ports.iter().map(|p| p.to_string()).collect();
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                svc.name,
                image,
                ports.join(", "),
                svc.depends_on.join(", ")
            );
        }
        md.push('\n');
    }

    md.push_str("## Diagram\n\n```plantuml\n");
    md.push_str(&render(project));
    md.push_str("```\n");
    md
}

fn titled_note(title: &str, lines: impl IntoIterator<Item = String>) -> Note {
    let lines: Vec<String> = lines.into_iter().collect();
    if lines.is_empty() {
        return Note::inline(Vec::new());
    }
    let mut all = vec![title.to_string()];
    all.extend(lines);
    Note::inline(all)
}

fn dockerfile_node(df: &Dockerfile, ids: &mut UniqueIds) -> Node {
    let id = ids.id_for(&format!("dockerfile:{}", df.path), &sanitize_id(&df.path));
    let mut node = Node::new(Shape::Component, id.clone(), df.path.clone())
        .note(Note::inline(vec![format!("FROM {}", df.base_image)]));

    for stage in &df.stages {
        let stage_id = ids.fresh(&format!("{}_stage_{}", id, stage.index));
        let child = Node::new(Shape::Component, stage_id, stage.display_name())
            .note(Note::inline(vec![format!("FROM {}", stage.base)]))
            .note(titled_note(
                "Steps",
                stage
                    .steps
                    .iter()
                    .map(|s| format!("{} {}", s.instruction, s.arguments)),
            ));
        node = node.child(child);
    }

    node.note(titled_note(
        "Environment",
        df.env.iter().map(|e| format!("{}={}", e.key, e.value)),
    ))
    .note(titled_note("Exposed Ports", df.exposed_ports.iter().cloned()))
    .note(titled_note("Volumes", df.volumes.iter().cloned()))
    .note(titled_note(
        "Commands",
        df.commands
            .iter()
            .map(|c| format!("{} {}", c.kind, c.command)),
    ))
}

fn compose_section(diagram: &mut Diagram, compose: &Compose, ids: &mut UniqueIds) {
    let title = if compose.version.is_empty() {
        "Docker Compose".to_string()
    } else {
        format!("Docker Compose (v{})", compose.version)
    };
    let mut section = Container::new(title);

    for svc in &compose.services {
        let id = ids.id_for(&format!("service:{}", svc.name), &sanitize_id(&svc.name));
        let mut node = Node::new(Shape::Component, id, svc.name.clone());
        if let Some(image) = &svc.image {
            node = node.note(Note::inline(vec![format!("Image: {}", image)]));
        } else if let Some(build) = &svc.build {
            node = node.note(Note::inline(vec![
                "Build:".to_string(),
                format!("Context: {}", build.context),
                format!("Dockerfile: {}", build.dockerfile.as_deref().unwrap_or("Dockerfile")),
            ]));
        }
        node = node
            .note(titled_note("Ports:", svc.ports.iter().map(|p| p.to_string())))
            .note(titled_note(
                "Environment:",
                svc.environment
                    .iter()
                    .map(|e| format!("{}={}", e.key, e.value)),
            ));
        section.nodes.push(node);
    }

    let mut networks = Container::new("Networks");
    for net in &compose.networks {
        let id = ids.id_for(&format!("network:{}", net.name), &sanitize_id(&net.name));
        let mut node = Node::new(Shape::Component, id, net.name.clone()).stereotype("network");
        if let Some(driver) = &net.driver {
            node = node.note(Note::inline(vec![format!("Driver: {}", driver)]));
        }
        networks.nodes.push(node);
    }
    if !networks.is_empty() {
        section.containers.push(networks);
    }

    let mut volumes = Container::new("Volumes");
    for vol in &compose.volumes {
        let id = ids.id_for(&format!("volume:{}", vol.name), &sanitize_id(&vol.name));
        let mut node = Node::new(Shape::Database, id, vol.name.clone());
        if let Some(driver) = &vol.driver {
            node = node.note(Note::inline(vec![format!("Driver: {}", driver)]));
        }
        volumes.nodes.push(node);
    }
    if !volumes.is_empty() {
        section.containers.push(volumes);
    }

    diagram.push_container(section);

    for svc in &compose.services {
        let Some(from) = ids.lookup(&format!("service:{}", svc.name)).map(String::from) else {
            continue;
        };
        for dep in &svc.depends_on {
            if let Some(to) = ids.lookup(&format!("service:{}", dep)) {
                diagram
                    .edges
                    .push(Edge::new(from.clone(), "..>", to).label("depends on"));
            }
        }
        for net in &svc.networks {
            if let Some(to) = ids.lookup(&format!("network:{}", net)) {
                diagram.edges.push(Edge::new(from.clone(), "--", to));
            }
        }
        for vol in svc.volumes.iter().filter(|v| !v.is_bind_mount()) {
            if let Some(to) = ids.lookup(&format!("volume:{}", vol.source)) {
                diagram.edges.push(Edge::new(from.clone(), "--", to));
            }
        }
    }
}

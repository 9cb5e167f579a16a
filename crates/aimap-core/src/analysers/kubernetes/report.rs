//! Markdown resource listing and Mermaid flowchart for Kubernetes manifests.

use std::fmt::Write;

use super::registry::ResourceSpec;
use super::{KubeDocs, Resource, ResourceKey};
use crate::render::{mermaid, Diagram, Edge, Node, Shape, UniqueIds};

fn node_style(kind: &str) -> &'static str {
    match kind {
        "Deployment" => "fill:#afd,stroke:#3a3",
        "StatefulSet" => "fill:#fad,stroke:#a33",
        "Service" => "fill:#ddf,stroke:#33a",
        "Ingress" => "fill:#ffa,stroke:#aa3",
        "Namespace" => "fill:#eee,stroke:#666",
        _ => "fill:#fff,stroke:#999",
    }
}

fn id_key(key: &ResourceKey) -> String {
    format!("{}/{}/{}", key.namespace, key.kind, key.name)
}

pub fn diagram(docs: &KubeDocs) -> Diagram {
    let mut diagram = Diagram::new("Kubernetes Infrastructure");
    let mut ids = UniqueIds::new();

    for resource in &docs.resources {
        let id = ids.id_for(&id_key(&resource.key()), &resource.name.to_lowercase());
        diagram.nodes.push(
            Node::new(
                Shape::Component,
                id,
                format!("{}: {}", resource.kind, resource.name),
            )
            .style(node_style(&resource.kind)),
        );
    }

    for rel in &docs.relations {
        let from = ids.id_for(&id_key(&rel.from), &rel.from.name.to_lowercase());
        let to = ids.id_for(&id_key(&rel.to), &rel.to.name.to_lowercase());
        diagram.edges.push(Edge::new(from, "-->", to));
    }
    diagram
}

/// Mermaid `graph TD` source, without code fences.
pub fn mermaid(docs: &KubeDocs) -> String {
    mermaid::flowchart(&diagram(docs), "TD")
}

/// Resources grouped by kind in first-seen order, with their relations and a diagram.
pub fn markdown(docs: &KubeDocs) -> String {
    let mut md = String::from("# Kubernetes Infrastructure\n\n");

    let mut kinds: Vec<&str> = Vec::new();
    for r in &docs.resources {
        if !kinds.contains(&r.kind.as_str()) {
            kinds.push(&r.kind);
        }
    }

    for kind in kinds {
        let _ = writeln!(md, "## {}\n", kind);
        for resource in docs.resources.iter().filter(|r| r.kind == kind) {
            write_resource(&mut md, docs, resource);
        }
    }

    md.push_str("## Diagram\n\n```mermaid\n");
    md.push_str(&mermaid(docs));
    md.push_str("```\n");
    md
}

fn write_resource(md: &mut String, docs: &KubeDocs, resource: &Resource) {
    let _ = writeln!(md, "### {}\n", resource.name);
    if let Some(ns) = &resource.namespace {
        let _ = writeln!(md, "Namespace: `{}`\n", ns);
    }

    match &resource.spec {
        ResourceSpec::Deployment(w) | ResourceSpec::StatefulSet(w) => {
            if let Some(replicas) = w.replicas {
                let _ = writeln!(md, "Replicas: {}\n", replicas);
            }
            if !w.containers.is_empty() {
                md.push_str("Containers:\n");
                for c in &w.containers {
                    let _ = writeln!(md, "- {} (`{}`)", c.name, c.image);
                }
                md.push('\n');
            }
        }
        ResourceSpec::Service(svc) => {
            if let Some(t) = &svc.service_type {
                let _ = writeln!(md, "Type: {}\n", t);
            }
            if !svc.ports.is_empty() {
                md.push_str("Ports:\n");
                for p in &svc.ports {
                    match &p.target_port {
                        Some(target) => {
                            let _ = writeln!(md, "- {} -> {}", p.port, target);
                        }
                        None => {
                            let _ = writeln!(md, "- {}", p.port);
                        }
                    }
                }
                md.push('\n');
            }
        }
        ResourceSpec::Ingress(ing) => {
            let hosts: Vec<&str> = ing.rules.iter().filter_map(|r| r.host.as_deref()).collect();
            if !hosts.is_empty() {
                md.push_str("Hosts:\n");
                for h in hosts {
                    let _ = writeln!(md, "- {}", h);
                }
                md.push('\n');
            }
        }
        ResourceSpec::Namespace | ResourceSpec::Other => {}
    }

    if !resource.labels.is_empty() {
        md.push_str("Labels:\n");
        for (k, v) in &resource.labels {
            let _ = writeln!(md, "- `{}: {}`", k, v);
        }
        md.push('\n');
    }

    let key = resource.key();
    let relations: Vec<_> = docs.relations.iter().filter(|r| r.from == key).collect();
    if !relations.is_empty() {
        md.push_str("Relations:\n");
        for rel in relations {
            let _ = writeln!(md, "- {} → {} ({})", rel.from.name, rel.to.name, rel.kind);
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysers::kubernetes::registry::KindRegistry;
    use crate::analysers::kubernetes::ManifestParser;
    use pretty_assertions::assert_eq;

    fn docs() -> KubeDocs {
        let mut parser = ManifestParser::new(KindRegistry::new());
        parser.parse_str(
            "app.yaml",
            "kind: Deployment\nmetadata: {name: Web}\nspec:\n  replicas: 2\n  template:\n    metadata:\n      labels: {app: web}\n---\nkind: Service\nmetadata: {name: web-svc}\nspec:\n  selector: {app: web}\n---\nkind: Ingress\nmetadata: {name: edge}\nspec:\n  rules:\n    - http:\n        paths:\n          - path: /\n            backend:\n              service: {name: web-svc, port: {number: 80}}\n",
        );
        parser.finish()
    }

    #[test]
    fn mermaid_nodes_styles_and_edges() {
        assert_eq!(
            mermaid(&docs()),
            "graph TD\n    web[Deployment: Web]\n    style web fill:#afd,stroke:#3a3\n    web_svc[Service: web-svc]\n    style web_svc fill:#ddf,stroke:#33a\n    edge[Ingress: edge]\n    style edge fill:#ffa,stroke:#aa3\n    web_svc --> web\n    edge --> web_svc\n"
        );
    }

    #[test]
    fn markdown_groups_by_kind() {
        let md = markdown(&docs());
        assert!(md.starts_with("# Kubernetes Infrastructure\n\n## Deployment\n\n### Web\n"));
        assert!(md.contains("Replicas: 2"));
        assert!(md.contains("- web-svc → Web (selects)"));
        assert!(md.contains("- edge → web-svc (routes)"));
        assert!(md.contains("```mermaid\ngraph TD\n"));
    }
}

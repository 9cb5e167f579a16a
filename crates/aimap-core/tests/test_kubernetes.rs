//! Kubernetes manifest discovery, ignore patterns and relation inference.

mod common;

use common::*;

use aimap_core::analysers::kubernetes::{self, KubeDocs, KubernetesAnalyser};
use aimap_core::analysers::Extractor;
use aimap_core::config::KubernetesConfig;
use aimap_core::graph::entity_graph::{EntityKind, EntityRef, RelationKind};
use pretty_assertions::assert_eq;

fn analyse(ignores: &[&str]) -> KubeDocs {
    let config = KubernetesConfig {
        enabled: true,
        paths: vec![fixture_str("kube_manifests")],
        ignores: ignores.iter().map(|s| s.to_string()).collect(),
    };
    KubernetesAnalyser::new(&config).analyse().unwrap()
}

fn names(docs: &KubeDocs) -> Vec<String> {
    docs.resources
        .iter()
        .map(|r| format!("{}/{}", r.kind, r.name))
        .collect()
}

#[test]
fn every_manifest_is_read_in_path_order() {
    let docs = analyse(&[]);
    assert_eq!(
        names(&docs),
        vec![
            "Deployment/web",
            "Service/web",
            "Ingress/edge",
            "ConfigMap/web-settings",
            "Deployment/rendered",
        ]
    );
    assert!(docs.resources.iter().all(|r| r.effective_namespace() == "shop"));
}

#[test]
fn ignored_directory_is_pruned() {
    let docs = analyse(&["generated"]);
    assert!(!names(&docs).contains(&"Deployment/rendered".to_string()));
    assert_eq!(docs.resources.len(), 4);
}

#[test]
fn invalid_ignore_pattern_is_dropped() {
    // The broken pattern is discarded; the valid one still applies.
    let docs = analyse(&["[unclosed", r"config\.yaml$"]);
    assert_eq!(
        names(&docs),
        vec![
            "Deployment/web",
            "Service/web",
            "Ingress/edge",
            "Deployment/rendered",
        ]
    );
}

#[test]
fn service_selects_matching_workloads() {
    let docs = analyse(&[]);
    let selected: Vec<(&str, &str)> = docs
        .relations
        .iter()
        .filter(|r| r.kind == RelationKind::Selects)
        .map(|r| (r.from.name.as_str(), r.to.name.as_str()))
        .collect();
    // `rendered` carries the same template labels, so it is selected too.
    assert_eq!(selected, vec![("web", "web"), ("web", "rendered")]);
}

#[test]
fn graph_and_report() {
    let docs = analyse(&["generated"]);
    let graph = <KubernetesAnalyser as Extractor>::build_graph(&docs);

    let service = EntityRef::scoped(EntityKind::Service, "shop", "web");
    let routes = graph.relations_of_kind(RelationKind::Routes);
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].to, service);
    assert!(graph.has_entity(&EntityRef::scoped(
        EntityKind::Resource,
        "shop",
        "ConfigMap/web-settings"
    )));
    assert!(graph.dangling().is_empty());

    let md = kubernetes::report::markdown(&docs);
    assert!(md.starts_with("# Kubernetes Infrastructure\n"));
    assert!(md.contains("## Ingress"));
}

#[test]
fn missing_path_is_an_error() {
    let config = KubernetesConfig {
        enabled: true,
        paths: vec!["/no/such/manifests".to_string()],
        ignores: Vec::new(),
    };
    assert!(KubernetesAnalyser::new(&config).analyse().is_err());
}

//! Orchestration manifests: multi-document YAML resources and the
//! selector/routing relations inferred between them.

pub mod inference;
pub mod registry;
pub mod report;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use walkdir::WalkDir;

use super::{read_lossy, Extractor};
use crate::config::KubernetesConfig;
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};
use crate::ignore::IgnoreSet;
use registry::{KindRegistry, Labels, ResourceSpec};

/// Namespace assumed for resources that do not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeDocs {
    pub resources: Vec<Resource>,
    pub relations: Vec<KubeRelation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub labels: Labels,
    pub spec: ResourceSpec,
    /// Manifest file and document index the resource came from.
    pub source: String,
    pub document: usize,
}

impl Resource {
    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            namespace: self.effective_namespace().to_string(),
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }

    pub fn effective_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

/// Identity of a resource within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubeRelation {
    pub from: ResourceKey,
    pub to: ResourceKey,
    pub kind: RelationKind,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Header {
    kind: String,
    metadata: Metadata,
    spec: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metadata {
    name: String,
    namespace: Option<String>,
    labels: Labels,
}

/// Parses manifests into an index keyed by `(namespace, kind, name)`.
pub struct ManifestParser {
    registry: KindRegistry,
    resources: Vec<Resource>,
    index: HashMap<ResourceKey, usize>,
}

impl ManifestParser {
    pub fn new(registry: KindRegistry) -> Self {
        Self {
            registry,
            resources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Parse every document of one manifest file. Bad documents are logged and skipped.
    pub fn parse_str(&mut self, source: &str, content: &str) {
        for (i, doc) in split_documents(content).into_iter().enumerate() {
            if doc.trim().is_empty() {
                continue;
            }
            match self.parse_document(source, i, doc) {
                Ok(Some(resource)) => {
                    if let Err(e) = self.register(resource) {
                        log::warn!("{} (document {}): {}", source, i, e);
                    }
                }
                Ok(None) => log::debug!("{} (document {}): not a resource", source, i),
                Err(e) => log::warn!("failed to decode {} (document {}): {}", source, i, e),
            }
        }
    }

    fn parse_document(&self, source: &str, index: usize, doc: &str) -> Result<Option<Resource>> {
        let header: Header = match serde_yaml::from_str::<Value>(doc)? {
            Value::Mapping(map) => serde_yaml::from_value(Value::Mapping(map))?,
            _ => return Ok(None),
        };
        if header.kind.is_empty() || header.metadata.name.is_empty() {
            return Ok(None);
        }

        let spec = self.registry.decode(&header.kind, &header.spec)?;
        log::debug!(
            "found {} {} in {}",
            header.kind,
            header.metadata.name,
            source
        );
        Ok(Some(Resource {
            name: header.metadata.name,
            kind: header.kind,
            namespace: header.metadata.namespace,
            labels: header.metadata.labels,
            spec,
            source: source.to_string(),
            document: index,
        }))
    }

    /// Index a resource. A key that already exists is rejected; the first one stays.
    pub fn register(&mut self, resource: Resource) -> Result<()> {
        let key = resource.key();
        if self.index.contains_key(&key) {
            return Err(AimapError::Duplicate(format!(
                "{}/{} {} already registered",
                key.namespace, key.kind, key.name
            )));
        }
        self.index.insert(key, self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Resource> {
        self.index.get(key).map(|&i| &self.resources[i])
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Run relation inference over everything parsed so far.
    pub fn finish(self) -> KubeDocs {
        let relations = inference::infer_relations(&self.resources);
        KubeDocs {
            resources: self.resources,
            relations,
        }
    }
}

/// Split a stream on `---` separator lines.
pub fn split_documents(content: &str) -> Vec<&str> {
    let mut docs = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed.starts_with("--- ") {
            docs.push(&content[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    docs.push(&content[start..]);
    docs
}

pub struct KubernetesAnalyser {
    paths: Vec<String>,
    ignores: IgnoreSet,
}

impl KubernetesAnalyser {
    pub fn new(config: &KubernetesConfig) -> Self {
        Self {
            paths: config.paths.clone(),
            ignores: IgnoreSet::new(&config.ignores),
        }
    }

    pub fn analyse(&self) -> Result<KubeDocs> {
        let mut parser = ManifestParser::new(KindRegistry::new());

        for root in &self.paths {
            if !Path::new(root).exists() {
                return Err(AimapError::PathNotFound(root.into()));
            }
            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !self.ignores.is_match(&e.path().to_string_lossy()));

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!("cannot read directory entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_manifest(entry.path()) {
                    continue;
                }
                let path = entry.path().to_string_lossy().to_string();
                log::info!("processing manifest {}", path);
                match read_lossy(entry.path()) {
                    Ok(content) => parser.parse_str(&path, &content),
                    Err(e) => log::warn!("failed to read {}: {}", path, e),
                }
            }
        }

        let docs = parser.finish();
        log::info!(
            "kubernetes analysis found {} resources and {} relations",
            docs.resources.len(),
            docs.relations.len()
        );
        Ok(docs)
    }
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl Extractor for KubernetesAnalyser {
    type Output = KubeDocs;

    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn extract(&mut self) -> Result<KubeDocs> {
        self.analyse()
    }

    fn build_graph(output: &KubeDocs) -> EntityGraph {
        build_graph(output)
    }
}

pub fn entity_kind(kind: &str) -> EntityKind {
    match kind {
        "Deployment" => EntityKind::Deployment,
        "StatefulSet" => EntityKind::StatefulSet,
        "Service" => EntityKind::Service,
        "Ingress" => EntityKind::Ingress,
        "Namespace" => EntityKind::Namespace,
        _ => EntityKind::Resource,
    }
}

/// Entity reference for a resource key; other kinds keep their kind in the name.
pub fn entity_ref(key: &ResourceKey) -> EntityRef {
    let kind = entity_kind(&key.kind);
    let name = match kind {
        EntityKind::Resource => format!("{}/{}", key.kind, key.name),
        _ => key.name.clone(),
    };
    EntityRef::scoped(kind, &key.namespace, name)
}

pub fn build_graph(docs: &KubeDocs) -> EntityGraph {
    let mut graph = EntityGraph::new();
    for resource in &docs.resources {
        let mut node = EntityNode::new(entity_ref(&resource.key()))
            .with_attr("source", resource.source.clone());
        for (k, v) in &resource.labels {
            node = node.with_attr(&format!("label.{}", k), v.clone());
        }
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }
    for rel in &docs.relations {
        graph.add_relation(&entity_ref(&rel.from), &entity_ref(&rel.to), rel.kind, None);
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_on_separator_lines_only() {
        let docs = split_documents("a: 1\n---\nb: '---'\n--- # second\nc: 3\n");
        assert_eq!(docs, vec!["a: 1\n", "b: '---'\n", "c: 3\n"]);
    }

    #[test]
    fn duplicate_key_keeps_first() {
        let mut parser = ManifestParser::new(KindRegistry::new());
        parser.parse_str(
            "a.yaml",
            "kind: Service\nmetadata: {name: web}\nspec: {type: ClusterIP}\n---\nkind: Service\nmetadata: {name: web}\nspec: {type: NodePort}\n",
        );
        assert_eq!(parser.resources().len(), 1);
        let key = ResourceKey {
            namespace: "default".into(),
            kind: "Service".into(),
            name: "web".into(),
        };
        let ResourceSpec::Service(svc) = &parser.get(&key).unwrap().spec else {
            panic!("expected a service");
        };
        assert_eq!(svc.service_type.as_deref(), Some("ClusterIP"));
    }

    #[test]
    fn same_name_in_other_namespace_or_kind_is_distinct() {
        let mut parser = ManifestParser::new(KindRegistry::new());
        parser.parse_str(
            "a.yaml",
            "kind: Service\nmetadata: {name: web}\n---\nkind: Service\nmetadata: {name: web, namespace: shop}\n---\nkind: Deployment\nmetadata: {name: web}\n",
        );
        assert_eq!(parser.resources().len(), 3);
    }

    #[test]
    fn bad_documents_are_skipped() {
        let mut parser = ManifestParser::new(KindRegistry::new());
        parser.parse_str(
            "a.yaml",
            "kind: Deployment\nmetadata: {name: api}\nspec: {replicas: many}\n---\n- not\n- a map\n---\n\n---\nkind: ConfigMap\nmetadata: {name: settings}\n",
        );
        let kinds: Vec<&str> = parser.resources().iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["ConfigMap"]);
        assert_eq!(parser.resources()[0].document, 3);
    }

    #[test]
    fn graph_uses_kind_specific_entities() {
        let mut parser = ManifestParser::new(KindRegistry::new());
        parser.parse_str(
            "a.yaml",
            "kind: ConfigMap\nmetadata: {name: web}\n---\nkind: Service\nmetadata: {name: web}\n",
        );
        let graph = build_graph(&parser.finish());
        assert!(graph.has_entity(&EntityRef::scoped(EntityKind::Resource, "default", "ConfigMap/web")));
        assert!(graph.has_entity(&EntityRef::scoped(EntityKind::Service, "default", "web")));
    }
}

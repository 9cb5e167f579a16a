//! Container manifests: Dockerfiles and docker-compose.

pub mod compose;
pub mod dockerfile;
pub mod plantuml;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{project_name, read_lossy, relative_path, walk_files, Extractor};
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};
use dockerfile::DockerfileParser;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerProject {
    pub name: String,
    pub dockerfiles: Vec<Dockerfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<Compose>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dockerfile {
    /// Path relative to the project root.
    pub path: String,
    pub base_image: String,
    pub stages: Vec<Stage>,
    pub env: Vec<EnvVar>,
    pub exposed_ports: Vec<String>,
    pub volumes: Vec<String>,
    pub commands: Vec<Command>,
}

/// A build stage opened by `FROM`. Steps belong to exactly one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub index: usize,
    pub name: Option<String>,
    pub base: String,
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("stage {}", self.index))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub instruction: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// `CMD` or `ENTRYPOINT`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: String,
    pub command: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compose {
    pub version: String,
    pub services: Vec<Service>,
    pub networks: Vec<NamedResource>,
    pub volumes: Vec<NamedResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub image: Option<String>,
    pub build: Option<BuildConfig>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMapping>,
    pub environment: Vec<EnvVar>,
    pub networks: Vec<String>,
    pub depends_on: Vec<String>,
    pub restart: Option<String>,
    pub healthcheck: Option<String>,
    pub replicas: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub context: String,
    pub dockerfile: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host: Option<String>,
    pub container: String,
    pub protocol: Option<String>,
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{}:", host)?;
        }
        f.write_str(&self.container)?;
        if let Some(proto) = &self.protocol {
            write!(f, "/{}", proto)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMapping {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMapping {
    /// Bind mounts reference host paths rather than named volumes.
    pub fn is_bind_mount(&self) -> bool {
        self.source.starts_with('.') || self.source.starts_with('/') || self.source.starts_with('~')
    }
}

/// Top-level compose network or volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub driver: Option<String>,
}

pub struct DockerAnalyser {
    root: PathBuf,
    parser: DockerfileParser,
}

impl DockerAnalyser {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(AimapError::PathNotFound(root));
        }
        Ok(Self {
            root,
            parser: DockerfileParser::new()?,
        })
    }

    pub fn analyse(&self) -> Result<DockerProject> {
        let mut project = DockerProject {
            name: project_name(&self.root),
            ..Default::default()
        };

        for path in self.find_dockerfiles() {
            let rel = relative_path(&self.root, &path);
            match read_lossy(&path) {
                Ok(content) => project.dockerfiles.push(self.parser.parse(&rel, &content)),
                Err(e) => log::warn!("failed to read {}: {}", rel, e),
            }
        }

        project.compose = self.analyse_compose();

        log::info!(
            "docker analysis found {} Dockerfiles, compose: {}",
            project.dockerfiles.len(),
            project.compose.is_some()
        );
        Ok(project)
    }

    /// Root-level `Dockerfile*` first, then the rest of the tree.
    fn find_dockerfiles(&self) -> Vec<PathBuf> {
        let (mut root_level, nested): (Vec<PathBuf>, Vec<PathBuf>) = walk_files(&self.root)
            .into_iter()
            .filter(|p| is_dockerfile(p))
            .partition(|p| p.parent() == Some(self.root.as_path()));
        root_level.extend(nested);
        root_level
    }

    fn analyse_compose(&self) -> Option<Compose> {
        let path = compose::COMPOSE_FILES
            .iter()
            .map(|name| self.root.join(name))
            .find(|p| p.is_file())?;
        let rel = relative_path(&self.root, &path);

        let content = match read_lossy(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("failed to read {}: {}", rel, e);
                return None;
            }
        };
        match compose::parse_compose(&rel, &content) {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("failed to parse {}: {}", rel, e);
                None
            }
        }
    }
}

fn is_dockerfile(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with("Dockerfile"))
        .unwrap_or(false)
}

impl Extractor for DockerAnalyser {
    type Output = DockerProject;

    fn name(&self) -> &'static str {
        "docker"
    }

    fn extract(&mut self) -> Result<DockerProject> {
        self.analyse()
    }

    fn build_graph(output: &DockerProject) -> EntityGraph {
        build_graph(output)
    }
}

/// Dockerfile/stage containment plus compose dependency, network and volume edges.
pub fn build_graph(project: &DockerProject) -> EntityGraph {
    let mut graph = EntityGraph::new();

    for df in &project.dockerfiles {
        let file = EntityRef::new(EntityKind::Dockerfile, &df.path);
        let node = EntityNode::new(file.clone()).with_attr("base", df.base_image.clone());
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
            continue;
        }

        for stage in &df.stages {
            let entity = EntityRef::scoped(EntityKind::Stage, &df.path, stage.display_name());
            let node = EntityNode::new(entity.clone()).with_attr("base", stage.base.clone());
            if let Err(e) = graph.add_entity(node) {
                log::warn!("{}", e);
                continue;
            }
            graph.add_relation(&file, &entity, RelationKind::Contains, None);

            let parent = df.stages[..stage.index].iter().find(|earlier| {
                earlier
                    .name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(&stage.base))
            });
            if let Some(parent) = parent {
                let to = EntityRef::scoped(EntityKind::Stage, &df.path, parent.display_name());
                graph.add_relation(&entity, &to, RelationKind::Inherits, None);
            }
        }
    }

    let Some(compose) = &project.compose else {
        return graph;
    };

    for net in &compose.networks {
        let _ = graph.add_entity(EntityNode::new(EntityRef::new(EntityKind::Network, &net.name)));
    }
    for vol in &compose.volumes {
        let _ = graph.add_entity(EntityNode::new(EntityRef::new(EntityKind::Volume, &vol.name)));
    }
    for svc in &compose.services {
        let mut node = EntityNode::new(EntityRef::new(EntityKind::ComposeService, &svc.name));
        if let Some(image) = &svc.image {
            node = node.with_attr("image", image.clone());
        }
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }

    for svc in &compose.services {
        let from = EntityRef::new(EntityKind::ComposeService, &svc.name);
        for dep in &svc.depends_on {
            let to = EntityRef::new(EntityKind::ComposeService, dep);
            graph.add_relation(&from, &to, RelationKind::DependsOn, None);
        }
        for net in &svc.networks {
            let to = EntityRef::new(EntityKind::Network, net);
            graph.add_relation(&from, &to, RelationKind::Connects, None);
        }
        for vol in svc.volumes.iter().filter(|v| !v.source.is_empty() && !v.is_bind_mount()) {
            let to = EntityRef::new(EntityKind::Volume, &vol.source);
            graph.add_relation(&from, &to, RelationKind::Mounts, Some(vol.target.clone()));
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn project() -> DockerProject {
        let parser = DockerfileParser::new().unwrap();
        let df = parser.parse(
            "Dockerfile",
            "FROM node:20 AS deps\nRUN npm ci\nFROM deps AS build\nRUN npm run build\nFROM nginx\n",
        );
        let compose = compose::parse_compose(
            "docker-compose.yml",
            "services:\n  web:\n    depends_on: [api]\n    volumes: ['./html:/usr/share/nginx/html']\n  api:\n    networks: [back]\n    volumes: ['data:/data']\nnetworks:\n  back: {}\nvolumes:\n  data: {}\n",
        )
        .unwrap();
        DockerProject {
            name: "shop".into(),
            dockerfiles: vec![df],
            compose: Some(compose),
        }
    }

    #[test]
    fn stage_inherits_from_named_stage() {
        let graph = build_graph(&project());
        let inherits = graph.relations_of_kind(RelationKind::Inherits);
        assert_eq!(inherits.len(), 1);
        assert_eq!(inherits[0].from.name, "build");
        assert_eq!(inherits[0].to.name, "deps");
        assert_eq!(graph.relations_of_kind(RelationKind::Contains).len(), 3);
    }

    #[test]
    fn compose_relations_skip_bind_mounts() {
        let graph = build_graph(&project());
        let kinds: Vec<(RelationKind, String, String)> = graph
            .relations()
            .into_iter()
            .filter(|r| r.from.kind == EntityKind::ComposeService)
            .map(|r| (r.kind, r.from.name, r.to.name))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (RelationKind::DependsOn, "web".to_string(), "api".to_string()),
                (RelationKind::Connects, "api".to_string(), "back".to_string()),
                (RelationKind::Mounts, "api".to_string(), "data".to_string()),
            ]
        );
        assert!(graph.dangling().is_empty());
    }

    #[test]
    fn port_display() {
        let port = PortMapping {
            host: Some("8080".into()),
            container: "80".into(),
            protocol: None,
        };
        assert_eq!(port.to_string(), "8080:80");
    }
}

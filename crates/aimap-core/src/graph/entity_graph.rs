//! In-memory entity/relation graph backed by petgraph::DiGraph.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::{AimapError, Result};

/// Concrete variant of an extracted entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    // Go code structure
    Package,
    Struct,
    Interface,
    Function,
    // Container manifests
    Dockerfile,
    Stage,
    ComposeService,
    Network,
    Volume,
    // Orchestration manifests
    Deployment,
    StatefulSet,
    Service,
    Ingress,
    Namespace,
    Resource,
    // Relational schema
    Schema,
    Table,
    View,
    MaterializedView,
    // Server framework
    Model,
    Controller,
    Route,
    // Front-end framework
    Component,
    Page,
    Api,
    StateStore,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Dockerfile => "dockerfile",
            Self::Stage => "stage",
            Self::ComposeService => "compose_service",
            Self::Network => "network",
            Self::Volume => "volume",
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::Service => "Service",
            Self::Ingress => "Ingress",
            Self::Namespace => "Namespace",
            Self::Resource => "resource",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::View => "view",
            Self::MaterializedView => "materialized_view",
            Self::Model => "model",
            Self::Controller => "controller",
            Self::Route => "route",
            Self::Component => "component",
            Self::Page => "page",
            Self::Api => "api",
            Self::StateStore => "state",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag of a directed relation. Direction is fixed per kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Selects,
    Routes,
    DependsOn,
    References,
    Contains,
    Inherits,
    Calls,
    Implements,
    Uses,
    Connects,
    Mounts,
    Controls,
    Handles,
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selects => "selects",
            Self::Routes => "routes",
            Self::DependsOn => "depends_on",
            Self::References => "references",
            Self::Contains => "contains",
            Self::Inherits => "inherits",
            Self::Calls => "calls",
            Self::Implements => "implements",
            Self::Uses => "uses",
            Self::Connects => "connects",
            Self::Mounts => "mounts",
            Self::Controls => "controls",
            Self::Handles => "handles",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
            Self::BelongsTo => "belongs_to",
            Self::BelongsToMany => "belongs_to_many",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weak lookup key for an entity, valid only within the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            scope: None,
        }
    }

    pub fn scoped(kind: EntityKind, scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            scope: Some(scope.into()),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}/{}", self.kind, scope, self.name),
            None => write!(f, "{}:{}", self.kind, self.name),
        }
    }
}

/// Node weight: the entity key plus a small attribute bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub entity: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    /// Placeholder for a relation target that was never extracted.
    #[serde(default)]
    pub dangling: bool,
}

impl EntityNode {
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            doc: None,
            attributes: Vec::new(),
            dangling: false,
        }
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc.filter(|d| !d.is_empty());
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }
}

/// Edge weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEdge {
    pub kind: RelationKind,
    pub label: Option<String>,
}

/// Flat relation record for queries and serialisation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relation {
    pub from: EntityRef,
    pub to: EntityRef,
    pub kind: RelationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Wrapper around petgraph::DiGraph with typed entity/relation methods.
///
/// Node and edge indices follow insertion order, which is what every
/// renderer iterates in.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    graph: DiGraph<EntityNode, RelationEdge>,
    /// O(1) EntityRef → NodeIndex lookup.
    index: HashMap<EntityRef, NodeIndex>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a new entity; an existing key is rejected and the first one kept.
    pub fn add_entity(&mut self, node: EntityNode) -> Result<NodeIndex> {
        if let Some(&idx) = self.index.get(&node.entity) {
            if self.graph[idx].dangling {
                // A forward reference is now backed by a real entity.
                self.graph[idx] = node;
                return Ok(idx);
            }
            return Err(AimapError::Duplicate(node.entity.to_string()));
        }
        let key = node.entity.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        Ok(idx)
    }

    /// Get or create a node by key.
    pub fn ensure_entity(&mut self, entity: EntityRef) -> NodeIndex {
        if let Some(&idx) = self.index.get(&entity) {
            return idx;
        }
        let idx = self.graph.add_node(EntityNode::new(entity.clone()));
        self.index.insert(entity, idx);
        idx
    }

    /// Add a directed relation. Unknown endpoints become dangling placeholders.
    pub fn add_relation(
        &mut self,
        from: &EntityRef,
        to: &EntityRef,
        kind: RelationKind,
        label: Option<String>,
    ) {
        let from_idx = self.ensure_placeholder(from);
        let to_idx = self.ensure_placeholder(to);
        self.graph
            .add_edge(from_idx, to_idx, RelationEdge { kind, label });
    }

    fn ensure_placeholder(&mut self, entity: &EntityRef) -> NodeIndex {
        if let Some(&idx) = self.index.get(entity) {
            return idx;
        }
        let mut node = EntityNode::new(entity.clone());
        node.dangling = true;
        let idx = self.graph.add_node(node);
        self.index.insert(entity.clone(), idx);
        idx
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&EntityNode> {
        self.index
            .get(entity)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn has_entity(&self, entity: &EntityRef) -> bool {
        self.index.contains_key(entity)
    }

    /// Extracted (non-dangling) entities in insertion order.
    pub fn entities(&self) -> Vec<&EntityNode> {
        self.graph
            .node_weights()
            .filter(|n| !n.dangling)
            .collect()
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<&EntityNode> {
        self.graph
            .node_weights()
            .filter(|n| !n.dangling && n.entity.kind == kind)
            .collect()
    }

    /// Relation targets that were never extracted.
    pub fn dangling(&self) -> Vec<&EntityRef> {
        self.graph
            .node_weights()
            .filter(|n| n.dangling)
            .map(|n| &n.entity)
            .collect()
    }

    /// All relations in insertion order.
    pub fn relations(&self) -> Vec<Relation> {
        self.graph
            .edge_references()
            .map(|e| Relation {
                from: self.graph[e.source()].entity.clone(),
                to: self.graph[e.target()].entity.clone(),
                kind: e.weight().kind,
                label: e.weight().label.clone(),
            })
            .collect()
    }

    pub fn relations_of_kind(&self, kind: RelationKind) -> Vec<Relation> {
        self.relations()
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }

    /// Outgoing relations of one entity.
    pub fn relations_from(&self, entity: &EntityRef) -> Vec<Relation> {
        let Some(&idx) = self.index.get(entity) else {
            return Vec::new();
        };
        let mut out: Vec<Relation> = self
            .graph
            .edges(idx)
            .map(|e| Relation {
                from: entity.clone(),
                to: self.graph[e.target()].entity.clone(),
                kind: e.weight().kind,
                label: e.weight().label.clone(),
            })
            .collect();
        // petgraph yields outgoing edges newest first
        out.reverse();
        out
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_weights().filter(|n| !n.dangling).count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

//! Swagger 2 / OpenAPI 3 descriptions, turned into HTTP request templates.

pub mod http;

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{read_lossy, Extractor};
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};

/// Maximum `$ref` indirections followed when synthesising bodies.
pub const MAX_REF_DEPTH: usize = 5;

/// Verbs in the order endpoints are emitted within one path.
pub const METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    #[serde(default)]
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, rename = "basePath", skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Swagger 2 schema definitions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// Parameters shared by every operation of the path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "post" => self.post.as_ref(),
            "put" => self.put.as_ref(),
            "patch" => self.patch.as_ref(),
            "delete" => self.delete.as_ref(),
            "head" => self.head.as_ref(),
            "options" => self.options.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// `Some(empty)` explicitly disables authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Swagger 2 non-body parameters carry their example inline.
    #[serde(default, rename = "x-example", skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
}

/// One operation with the path and verb it was declared under.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint<'a> {
    pub method: &'static str,
    pub path: &'a str,
    pub operation: &'a Operation,
    pub shared_parameters: &'a [Parameter],
}

impl<'a> Endpoint<'a> {
    pub fn tag(&self) -> &'a str {
        let operation: &'a Operation = self.operation;
        operation
            .tags
            .first()
            .map(String::as_str)
            .unwrap_or("default")
    }

    /// `operationId`, or the verb joined with the path.
    pub fn name(&self) -> String {
        if let Some(id) = &self.operation.operation_id {
            return id.clone();
        }
        let path: String = self
            .path
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .map(|c| if c == '/' { '_' } else { c })
            .collect();
        format!("{}_{}", self.method, path.trim_matches('_'))
    }

    /// Path-level parameters followed by the operation's own.
    pub fn parameters(&self) -> impl Iterator<Item = &'a Parameter> + 'a {
        let operation: &'a Operation = self.operation;
        self.shared_parameters
            .iter()
            .chain(operation.parameters.iter())
    }
}

impl ApiSpec {
    pub fn parse(content: &str) -> Result<Self> {
        let spec: ApiSpec = serde_json::from_str(content)?;
        if spec.swagger.is_none() && spec.openapi.is_none() {
            return Err(AimapError::InvalidSpec(
                "document has neither a `swagger` nor an `openapi` field".to_string(),
            ));
        }
        Ok(spec)
    }

    pub fn base_url(&self) -> String {
        if let Some(server) = self.servers.first() {
            return server.url.clone();
        }
        match &self.host {
            Some(host) => format!(
                "https://{}{}",
                host,
                self.base_path.as_deref().unwrap_or_default()
            ),
            None => "http://localhost:8080".to_string(),
        }
    }

    /// Every operation in path order, then verb order.
    pub fn endpoints(&self) -> Vec<Endpoint<'_>> {
        let mut out = Vec::new();
        for (path, item) in &self.paths {
            for &method in METHODS {
                if let Some(operation) = item.operation(method) {
                    out.push(Endpoint {
                        method,
                        path,
                        operation,
                        shared_parameters: &item.parameters,
                    });
                }
            }
        }
        out
    }

    /// Endpoints grouped by their first tag.
    pub fn endpoints_by_tag(&self) -> BTreeMap<String, Vec<Endpoint<'_>>> {
        let mut groups: BTreeMap<String, Vec<Endpoint<'_>>> = BTreeMap::new();
        for endpoint in self.endpoints() {
            groups
                .entry(endpoint.tag().to_string())
                .or_default()
                .push(endpoint);
        }
        groups
    }

    /// Look up `#/components/schemas/X` or `#/definitions/X`.
    pub fn resolve(&self, reference: &str) -> Option<&Schema> {
        if let Some(name) = reference.strip_prefix("#/components/schemas/") {
            return self.components.as_ref()?.schemas.get(name);
        }
        if let Some(name) = reference.strip_prefix("#/definitions/") {
            return self.definitions.get(name);
        }
        None
    }
}

pub struct SwaggerParser {
    file: PathBuf,
}

impl SwaggerParser {
    pub fn new(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        if !file.is_file() {
            return Err(AimapError::PathNotFound(file));
        }
        Ok(Self { file })
    }

    pub fn parse(&self) -> Result<ApiSpec> {
        let content = read_lossy(&self.file)?;
        let spec = ApiSpec::parse(&content).map_err(|e| match e {
            AimapError::Json(err) => AimapError::Parse {
                path: self.file.display().to_string(),
                message: err.to_string(),
            },
            other => other,
        })?;
        log::info!(
            "parsed API description {} with {} endpoints",
            self.file.display(),
            spec.endpoints().len()
        );
        Ok(spec)
    }
}

impl Extractor for SwaggerParser {
    type Output = ApiSpec;

    fn name(&self) -> &'static str {
        "swagger"
    }

    fn extract(&mut self) -> Result<ApiSpec> {
        self.parse()
    }

    fn build_graph(output: &ApiSpec) -> EntityGraph {
        build_graph(output)
    }
}

/// Endpoint table per tag.
pub fn markdown(spec: &ApiSpec) -> String {
    let title = if spec.info.title.is_empty() {
        "API"
    } else {
        spec.info.title.as_str()
    };
    let mut md = format!("# API: {}\n\n", title);
    if !spec.info.version.is_empty() {
        let _ = writeln!(md, "Version: {}\n", spec.info.version);
    }
    let _ = writeln!(md, "Base URL: `{}`\n", spec.base_url());

    for (tag, endpoints) in spec.endpoints_by_tag() {
        let _ = writeln!(md, "## {}\n", tag);
        md.push_str("| Method | Path | Name | Summary |\n|--------|------|------|---------|\n");
        for endpoint in &endpoints {
            let _ = writeln!(
                md,
                "| {} | `{}` | {} | {} |",
                endpoint.method.to_uppercase(),
                endpoint.path,
                endpoint.name(),
                endpoint.operation.summary.as_deref().unwrap_or_default()
            );
        }
        md.push('\n');
    }
    md
}

/// Tags contain their endpoints.
pub fn build_graph(spec: &ApiSpec) -> EntityGraph {
    let mut graph = EntityGraph::new();
    for (tag, endpoints) in spec.endpoints_by_tag() {
        let group = EntityRef::new(EntityKind::Resource, format!("tag/{}", tag));
        if let Err(e) = graph.add_entity(EntityNode::new(group.clone())) {
            log::warn!("{}", e);
        }
        for endpoint in endpoints {
            let entity = EntityRef::new(
                EntityKind::Api,
                format!("{} {}", endpoint.method.to_uppercase(), endpoint.path),
            );
            let node = EntityNode::new(entity.clone())
                .with_doc(endpoint.operation.summary.clone())
                .with_attr("name", endpoint.name());
            if let Err(e) = graph.add_entity(node) {
                log::warn!("{}", e);
                continue;
            }
            graph.add_relation(&group, &entity, RelationKind::Contains, None);
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PETSTORE: &str = r#"{
        "swagger": "2.0",
        "info": { "title": "Petstore", "version": "1" },
        "host": "petstore.example.com",
        "basePath": "/v1",
        "paths": {
            "/pets/{id}": {
                "delete": { "tags": ["pets"] },
                "get": { "tags": ["pets"], "operationId": "getPet" }
            },
            "/health": { "get": {} }
        }
    }"#;

    #[test]
    fn rejects_documents_without_version_field() {
        let err = ApiSpec::parse(r#"{"info": {"title": "x"}}"#).unwrap_err();
        assert!(matches!(err, AimapError::InvalidSpec(_)));
    }

    #[test]
    fn base_url_fallbacks() {
        let spec = ApiSpec::parse(PETSTORE).unwrap();
        assert_eq!(spec.base_url(), "https://petstore.example.com/v1");

        let open = ApiSpec::parse(r#"{"openapi": "3.0.0", "servers": [{"url": "https://api.example.com"}]}"#).unwrap();
        assert_eq!(open.base_url(), "https://api.example.com");

        let bare = ApiSpec::parse(r#"{"openapi": "3.0.0"}"#).unwrap();
        assert_eq!(bare.base_url(), "http://localhost:8080");
    }

    #[test]
    fn endpoints_ordered_and_grouped() {
        let spec = ApiSpec::parse(PETSTORE).unwrap();
        let order: Vec<(String, &str)> = spec
            .endpoints()
            .iter()
            .map(|e| (e.name(), e.tag()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("get_health".to_string(), "default"),
                ("getPet".to_string(), "pets"),
                ("delete_pets_id".to_string(), "pets"),
            ]
        );
        let groups = spec.endpoints_by_tag();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["default", "pets"]);
    }

    #[test]
    fn markdown_tables_per_tag() {
        let md = markdown(&ApiSpec::parse(PETSTORE).unwrap());
        assert!(md.starts_with("# API: Petstore\n\nVersion: 1\n\nBase URL: `https://petstore.example.com/v1`\n"));
        assert!(md.contains("## pets\n\n| Method | Path | Name | Summary |\n|--------|------|------|---------|\n| GET | `/pets/{id}` | getPet |  |\n"));
    }

    #[test]
    fn graph_groups_endpoints_by_tag() {
        let graph = build_graph(&ApiSpec::parse(PETSTORE).unwrap());
        assert_eq!(graph.entities_of_kind(EntityKind::Api).len(), 3);
        assert_eq!(graph.relations_of_kind(RelationKind::Contains).len(), 3);
    }
}

//! PHP server framework projects: models, controllers, routes and migrations
//! recovered by pattern rules.

pub mod report;
pub mod rules;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::pattern::RuleSet;
use super::{project_name, read_lossy, relative_path, walk_files, Extractor};
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaravelProject {
    pub name: String,
    pub models: Vec<Model>,
    pub controllers: Vec<Controller>,
    pub routes: Vec<Route>,
    pub migrations: Vec<Migration>,
    pub middleware: Vec<Middleware>,
    pub providers: Vec<Provider>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub path: String,
    /// Explicit `$table`; `None` means the framework's naming convention applies.
    pub table: Option<String>,
    pub fillable: Vec<String>,
    pub hidden: Vec<String>,
    pub casts: Vec<Cast>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub field: String,
    pub cast_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
            Self::BelongsTo => "belongsTo",
            Self::BelongsToMany => "belongsToMany",
        }
    }

    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "hasOne" => Some(Self::HasOne),
            "hasMany" => Some(Self::HasMany),
            "belongsTo" => Some(Self::BelongsTo),
            "belongsToMany" => Some(Self::BelongsToMany),
            _ => None,
        }
    }

    fn relation_kind(&self) -> RelationKind {
        match self {
            Self::HasOne => RelationKind::HasOne,
            Self::HasMany => RelationKind::HasMany,
            Self::BelongsTo => RelationKind::BelongsTo,
            Self::BelongsToMany => RelationKind::BelongsToMany,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub method: String,
    pub related_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_table: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub name: String,
    pub path: String,
    pub methods: Vec<ControllerMethod>,
    pub middleware: Vec<String>,
    /// Models imported with `use App\Models\X;`.
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerMethod {
    pub name: String,
    pub parameters: Vec<String>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub method: String,
    pub uri: String,
    pub controller: Option<String>,
    pub action: Option<String>,
    pub name: Option<String>,
    pub middleware: Vec<String>,
    /// Route file stem: `web` or `api`.
    pub source: String,
}

impl Route {
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.uri)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    pub name: String,
    pub timestamp: String,
    pub table: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<MigrationIndex>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub primary: bool,
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignReference>,
    /// Raw modifier chain, e.g. `nullable()`, `default(0)`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignReference {
    pub table: String,
    pub column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationIndex {
    /// `index`, `unique` or `primary`.
    pub kind: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Middleware {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub path: String,
    pub parent: Option<String>,
    pub deferred: bool,
}

const ROUTE_FILES: &[&str] = &["web", "api"];

pub struct LaravelAnalyser {
    root: PathBuf,
    models: RuleSet<Model>,
    controllers: RuleSet<Controller>,
    routes: RuleSet<Vec<Route>>,
    migrations: RuleSet<Migration>,
    providers: RuleSet<Provider>,
}

impl LaravelAnalyser {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(AimapError::PathNotFound(root));
        }
        Ok(Self {
            root,
            models: rules::model_rules()?,
            controllers: rules::controller_rules()?,
            routes: rules::route_rules()?,
            migrations: rules::migration_rules()?,
            providers: rules::provider_rules()?,
        })
    }

    pub fn analyse(&self) -> Result<LaravelProject> {
        if !self.root.join("artisan").is_file() {
            log::warn!(
                "{} has no artisan script; scanning anyway",
                self.root.display()
            );
        }

        let mut project = LaravelProject {
            name: project_name(&self.root),
            ..Default::default()
        };

        for (path, content) in self.php_sources("app/Models", false) {
            let mut model = Model {
                name: file_stem(&path),
                path: relative_path(&self.root, &path),
                ..Default::default()
            };
            self.models.apply(&mut model, &content);
            project.models.push(model);
        }

        for (path, content) in self.php_sources("app/Http/Controllers", true) {
            let name = file_stem(&path);
            if name == "Controller" {
                continue;
            }
            let mut controller = Controller {
                name,
                path: relative_path(&self.root, &path),
                ..Default::default()
            };
            self.controllers.apply(&mut controller, &content);
            project.controllers.push(controller);
        }

        for source in ROUTE_FILES {
            let path = self.root.join("routes").join(format!("{}.php", source));
            let Some(content) = self.read(&path) else {
                continue;
            };
            let mut routes = Vec::new();
            self.routes.apply(&mut routes, &content);
            for mut route in routes {
                route.source = source.to_string();
                project.routes.push(route);
            }
        }

        for (path, content) in self.php_sources("database/migrations", false) {
            let stem = file_stem(&path);
            let (timestamp, name) = split_migration_name(&stem);
            let mut migration = Migration {
                name,
                timestamp,
                path: relative_path(&self.root, &path),
                ..Default::default()
            };
            self.migrations.apply(&mut migration, &content);
            project.migrations.push(migration);
        }

        for (path, _) in self.php_sources("app/Http/Middleware", false) {
            project.middleware.push(Middleware {
                name: file_stem(&path),
                path: relative_path(&self.root, &path),
            });
        }

        for (path, content) in self.php_sources("app/Providers", false) {
            let mut provider = Provider {
                name: file_stem(&path),
                path: relative_path(&self.root, &path),
                ..Default::default()
            };
            self.providers.apply(&mut provider, &content);
            project.providers.push(provider);
        }

        log::info!(
            "laravel analysis found {} models, {} controllers, {} routes, {} migrations",
            project.models.len(),
            project.controllers.len(),
            project.routes.len(),
            project.migrations.len()
        );
        Ok(project)
    }

    /// `.php` files under `dir`, read and sorted; unreadable files are skipped.
    fn php_sources(&self, dir: &str, recursive: bool) -> Vec<(PathBuf, String)> {
        let dir = self.root.join(dir);
        if !dir.is_dir() {
            return Vec::new();
        }
        walk_files(&dir)
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "php"))
            .filter(|p| recursive || p.parent() == Some(dir.as_path()))
            .filter_map(|p| self.read(&p).map(|c| (p, c)))
            .collect()
    }

    fn read(&self, path: &Path) -> Option<String> {
        if !path.is_file() {
            return None;
        }
        match read_lossy(path) {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!("failed to read {}: {}", relative_path(&self.root, path), e);
                None
            }
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `2024_01_15_120000_create_users_table` → (`2024_01_15_120000`, `create_users_table`).
pub fn split_migration_name(stem: &str) -> (String, String) {
    let parts: Vec<&str> = stem.splitn(5, '_').collect();
    let stamped = parts.len() == 5
        && parts[..4]
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if stamped {
        (parts[..4].join("_"), parts[4].to_string())
    } else {
        (String::new(), stem.to_string())
    }
}

/// Models a controller works with: imported ones plus the one its name implies.
pub fn controlled_models<'a>(controller: &Controller, models: &'a [Model]) -> Vec<&'a str> {
    let implied = controller.name.strip_suffix("Controller");
    models
        .iter()
        .map(|m| m.name.as_str())
        .filter(|name| Some(*name) == implied || controller.models.iter().any(|u| u == name))
        .collect()
}

impl Extractor for LaravelAnalyser {
    type Output = LaravelProject;

    fn name(&self) -> &'static str {
        "laravel"
    }

    fn extract(&mut self) -> Result<LaravelProject> {
        self.analyse()
    }

    fn build_graph(output: &LaravelProject) -> EntityGraph {
        build_graph(output)
    }
}

/// Model relationships, controller-to-model control and route handling.
pub fn build_graph(project: &LaravelProject) -> EntityGraph {
    let mut graph = EntityGraph::new();

    for model in &project.models {
        let mut node = EntityNode::new(EntityRef::new(EntityKind::Model, &model.name));
        if let Some(table) = &model.table {
            node = node.with_attr("table", table.clone());
        }
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }
    for controller in &project.controllers {
        let node = EntityNode::new(EntityRef::new(EntityKind::Controller, &controller.name))
            .with_attr("path", controller.path.clone());
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }

    for model in &project.models {
        let from = EntityRef::new(EntityKind::Model, &model.name);
        for rel in &model.relationships {
            let to = EntityRef::new(EntityKind::Model, &rel.related_model);
            graph.add_relation(&from, &to, rel.kind.relation_kind(), Some(rel.method.clone()));
        }
    }

    for controller in &project.controllers {
        let from = EntityRef::new(EntityKind::Controller, &controller.name);
        for model in controlled_models(controller, &project.models) {
            let to = EntityRef::new(EntityKind::Model, model);
            graph.add_relation(&from, &to, RelationKind::Controls, None);
        }
    }

    for route in &project.routes {
        let entity = EntityRef::new(EntityKind::Route, route.label());
        let mut node = EntityNode::new(entity.clone()).with_attr("source", route.source.clone());
        if let Some(name) = &route.name {
            node = node.with_attr("name", name.clone());
        }
        // The same verb and URI may be declared in both route files.
        if graph.add_entity(node).is_err() {
            log::debug!("route {} declared more than once", route.label());
        }
        if let Some(controller) = &route.controller {
            let to = EntityRef::new(EntityKind::Controller, controller);
            graph.add_relation(&entity, &to, RelationKind::Handles, route.action.clone());
        }
    }

    graph
}

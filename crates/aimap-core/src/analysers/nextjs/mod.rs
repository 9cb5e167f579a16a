//! React/Next.js front-end projects: components, pages, layouts, state
//! modules and API routes.

pub mod report;
pub mod rules;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::pattern::RuleSet;
use super::{project_name, read_lossy, relative_path, walk_files, Extractor};
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::{EntityGraph, EntityKind, EntityNode, EntityRef, RelationKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextjsProject {
    pub name: String,
    pub components: Vec<Component>,
    pub pages: Vec<Page>,
    pub layouts: Vec<Layout>,
    pub state_modules: Vec<StateModule>,
    pub apis: Vec<Api>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    #[default]
    Functional,
    Class,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub path: String,
    pub kind: ComponentKind,
    /// Carries a `"use client"` directive.
    pub client: bool,
    /// Carries a `"use server"` directive.
    pub server: bool,
    pub props: Vec<Prop>,
    pub hooks: Vec<Hook>,
    /// Components imported from project-local modules.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub name: String,
    #[serde(rename = "type")]
    pub prop_type: String,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Router {
    #[default]
    App,
    Pages,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub route: String,
    pub path: String,
    pub router: Router,
    pub params: Vec<RouteParam>,
    /// Path of the nearest enclosing layout file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub components: Vec<String>,
    pub apis: Vec<String>,
}

impl Page {
    pub fn is_dynamic(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Dynamic route segment: `[id]`, `[...slug]` or `[[...slug]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParam {
    pub name: String,
    pub catch_all: bool,
    pub optional: bool,
}

impl RouteParam {
    pub fn from_segment(segment: &str) -> Option<Self> {
        if let Some(inner) = segment.strip_prefix("[[...").and_then(|s| s.strip_suffix("]]")) {
            return Some(Self {
                name: inner.to_string(),
                catch_all: true,
                optional: true,
            });
        }
        let inner = segment.strip_prefix('[')?.strip_suffix(']')?;
        Some(match inner.strip_prefix("...") {
            Some(name) => Self {
                name: name.to_string(),
                catch_all: true,
                optional: false,
            },
            None => Self {
                name: inner.to_string(),
                catch_all: false,
                optional: false,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub route: String,
    pub path: String,
    pub root: bool,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateLibrary {
    Redux,
    Zustand,
    Jotai,
    #[default]
    Custom,
}

impl StateLibrary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redux => "redux",
            Self::Zustand => "zustand",
            Self::Jotai => "jotai",
            Self::Custom => "custom",
        }
    }

    pub fn detect(content: &str) -> Self {
        if content.contains("createSlice") || content.contains("configureStore") {
            Self::Redux
        } else if content.contains("zustand") || content.contains("create((set)") {
            Self::Zustand
        } else if content.contains("jotai") || content.contains("atom(") {
            Self::Jotai
        } else {
            Self::Custom
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateModule {
    pub name: String,
    pub path: String,
    pub library: StateLibrary,
    pub actions: Vec<StateAction>,
    pub slices: Vec<String>,
    pub atoms: Vec<Atom>,
}

impl StateModule {
    pub fn new(name: impl Into<String>, path: impl Into<String>, library: StateLibrary) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            library,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateAction {
    pub name: String,
    /// `reducer` or `setter`.
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub name: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Api {
    pub route: String,
    pub path: String,
    pub methods: Vec<String>,
    pub handler: Option<String>,
    pub middleware: Vec<String>,
}

impl Api {
    /// Whether a called URL targets this route. Origins, query strings and
    /// template placeholders are ignored.
    pub fn matches(&self, url: &str) -> bool {
        let path = strip_origin(url);
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let called: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let declared: Vec<&str> = self.route.split('/').filter(|s| !s.is_empty()).collect();

        for (i, segment) in declared.iter().enumerate() {
            match RouteParam::from_segment(segment) {
                Some(p) if p.catch_all => {
                    return if p.optional {
                        called.len() >= i
                    } else {
                        called.len() > i
                    };
                }
                Some(_) => {
                    if i >= called.len() {
                        return false;
                    }
                }
                None => match called.get(i) {
                    Some(c) if c == segment || c.contains("${") => {}
                    _ => return false,
                },
            }
        }
        called.len() == declared.len()
    }
}

fn strip_origin(url: &str) -> &str {
    for scheme in ["http://", "https://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return rest.find('/').map_or("/", |i| &rest[i..]);
        }
    }
    url
}

const SOURCE_ROOTS: &[&str] = &["src/", ""];
const SCRIPT_EXTENSIONS: &[&str] = &["tsx", "jsx", "js", "ts"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.contains(&e))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Route of an app-router directory; route groups and parallel slots are dropped.
pub fn app_route(dir: &Path) -> String {
    let segments: Vec<String> = dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .filter(|s| !(s.starts_with('(') && s.ends_with(')')) && !s.starts_with('@'))
        .collect();
    format!("/{}", segments.join("/"))
}

/// Route of a pages-router file path without extension; `index` maps to its directory.
pub fn pages_route(file: &Path) -> String {
    let mut segments: Vec<String> = file
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if segments.last().map(String::as_str) == Some("index") {
        segments.pop();
    }
    format!("/{}", segments.join("/"))
}

fn route_params(route: &str) -> Vec<RouteParam> {
    route.split('/').filter_map(RouteParam::from_segment).collect()
}

pub struct NextjsAnalyser {
    root: PathBuf,
    components: RuleSet<Component>,
    pages: RuleSet<Page>,
    layouts: RuleSet<Layout>,
    redux: RuleSet<StateModule>,
    zustand: RuleSet<StateModule>,
    jotai: RuleSet<StateModule>,
    apis: RuleSet<Api>,
}

impl NextjsAnalyser {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(AimapError::PathNotFound(root));
        }
        Ok(Self {
            root,
            components: rules::component_rules()?,
            pages: rules::page_rules()?,
            layouts: rules::layout_rules()?,
            redux: rules::redux_rules()?,
            zustand: rules::zustand_rules()?,
            jotai: rules::jotai_rules()?,
            apis: rules::api_rules()?,
        })
    }

    pub fn analyse(&self) -> Result<NextjsProject> {
        let mut project = NextjsProject {
            name: project_name(&self.root),
            ..Default::default()
        };

        self.scan_components(&mut project);
        for base in SOURCE_ROOTS {
            self.scan_app_router(&format!("{}app", base), &mut project);
            self.scan_pages_router(&format!("{}pages", base), &mut project);
        }
        self.scan_state(&mut project);
        assign_layouts(&mut project);

        log::info!(
            "nextjs analysis found {} components, {} pages, {} api routes, {} state modules",
            project.components.len(),
            project.pages.len(),
            project.apis.len(),
            project.state_modules.len()
        );
        Ok(project)
    }

    /// Readable files under `dir` with their path relative to `dir`.
    fn sources(&self, dir: &str) -> Vec<(PathBuf, PathBuf, String)> {
        let base = self.root.join(dir);
        if !base.is_dir() {
            return Vec::new();
        }
        walk_files(&base)
            .into_iter()
            .filter(|p| has_extension(p, SCRIPT_EXTENSIONS))
            .filter_map(|p| {
                let local = p.strip_prefix(&base).ok()?.to_path_buf();
                match read_lossy(&p) {
                    Ok(content) => Some((p, local, content)),
                    Err(e) => {
                        log::warn!("failed to read {}: {}", relative_path(&self.root, &p), e);
                        None
                    }
                }
            })
            .collect()
    }

    fn scan_components(&self, project: &mut NextjsProject) {
        for base in SOURCE_ROOTS {
            for (path, _, content) in self.sources(&format!("{}components", base)) {
                if !has_extension(&path, &["tsx", "jsx", "js"]) {
                    continue;
                }
                let mut name = file_stem(&path);
                if name == "index" {
                    name = path
                        .parent()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                }
                if !name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    continue;
                }
                let mut component = Component {
                    name,
                    path: relative_path(&self.root, &path),
                    ..Default::default()
                };
                self.components.apply(&mut component, &content);
                project.components.push(component);
            }
        }
    }

    fn scan_app_router(&self, dir: &str, project: &mut NextjsProject) {
        for (path, local, content) in self.sources(dir) {
            let stem = file_stem(&path);
            let parent = local.parent().unwrap_or(Path::new(""));
            let in_api = local.starts_with("api");

            if in_api && stem == "route" {
                let route = app_route(parent);
                project.apis.push(self.api(&path, route, &content));
            } else if !in_api && stem == "page" && !has_extension(&path, &["ts"]) {
                let route = app_route(parent);
                let mut page = Page {
                    params: route_params(&route),
                    route,
                    path: relative_path(&self.root, &path),
                    router: Router::App,
                    ..Default::default()
                };
                self.pages.apply(&mut page, &content);
                project.pages.push(page);
            } else if !in_api && stem == "layout" {
                let route = app_route(parent);
                let root = route == "/";
                let mut layout = Layout {
                    name: (if root { "RootLayout" } else { "Layout" }).to_string(),
                    route,
                    path: relative_path(&self.root, &path),
                    root,
                    ..Default::default()
                };
                self.layouts.apply(&mut layout, &content);
                project.layouts.push(layout);
            }
        }
    }

    fn scan_pages_router(&self, dir: &str, project: &mut NextjsProject) {
        for (path, local, content) in self.sources(dir) {
            if local.starts_with("api") {
                let route = pages_route(&local);
                project.apis.push(self.api(&path, route, &content));
                continue;
            }
            if file_stem(&path).starts_with('_') || has_extension(&path, &["ts"]) {
                continue;
            }
            let route = pages_route(&local);
            let mut page = Page {
                params: route_params(&route),
                route,
                path: relative_path(&self.root, &path),
                router: Router::Pages,
                ..Default::default()
            };
            self.pages.apply(&mut page, &content);
            project.pages.push(page);
        }
    }

    fn api(&self, path: &Path, route: String, content: &str) -> Api {
        let mut api = Api {
            route,
            path: relative_path(&self.root, path),
            ..Default::default()
        };
        self.apis.apply(&mut api, content);
        if api.methods.is_empty() {
            api.methods.push("GET".to_string());
        }
        api
    }

    fn scan_state(&self, project: &mut NextjsProject) {
        for base in SOURCE_ROOTS {
            for dir in ["store", "state"] {
                for (path, _, content) in self.sources(&format!("{}{}", base, dir)) {
                    let library = StateLibrary::detect(&content);
                    let mut module = StateModule::new(
                        file_stem(&path),
                        relative_path(&self.root, &path),
                        library,
                    );
                    match library {
                        StateLibrary::Redux => self.redux.apply(&mut module, &content),
                        StateLibrary::Zustand => self.zustand.apply(&mut module, &content),
                        StateLibrary::Jotai => self.jotai.apply(&mut module, &content),
                        StateLibrary::Custom => {}
                    }
                    project.state_modules.push(module);
                }
            }
        }
    }
}

/// Attach each app-router page to the deepest layout whose directory encloses it.
fn assign_layouts(project: &mut NextjsProject) {
    for page in project.pages.iter_mut().filter(|p| p.router == Router::App) {
        let page_path = Path::new(&page.path);
        page.layout = project
            .layouts
            .iter()
            .filter_map(|l| {
                let dir = Path::new(&l.path).parent()?;
                page_path.starts_with(dir).then_some((dir.components().count(), l))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, l)| l.path.clone());
    }
}

impl Extractor for NextjsAnalyser {
    type Output = NextjsProject;

    fn name(&self) -> &'static str {
        "nextjs"
    }

    fn extract(&mut self) -> Result<NextjsProject> {
        self.analyse()
    }

    fn build_graph(output: &NextjsProject) -> EntityGraph {
        build_graph(output)
    }
}

/// Page and component usage plus page-to-API calls. Only extracted targets
/// are linked.
pub fn build_graph(project: &NextjsProject) -> EntityGraph {
    let mut graph = EntityGraph::new();

    for component in &project.components {
        let node = EntityNode::new(EntityRef::new(EntityKind::Component, &component.name))
            .with_attr("path", component.path.clone());
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }
    for page in &project.pages {
        let node = EntityNode::new(EntityRef::new(EntityKind::Page, &page.route))
            .with_attr("path", page.path.clone());
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }
    for api in &project.apis {
        let node = EntityNode::new(EntityRef::new(EntityKind::Api, &api.route))
            .with_attr("methods", api.methods.join(","));
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }
    for module in &project.state_modules {
        let node = EntityNode::new(EntityRef::new(EntityKind::StateStore, &module.name))
            .with_attr("library", module.library.as_str());
        if let Err(e) = graph.add_entity(node) {
            log::warn!("{}", e);
        }
    }

    for component in &project.components {
        let from = EntityRef::new(EntityKind::Component, &component.name);
        for import in component.imports.iter().filter(|i| **i != component.name) {
            let to = EntityRef::new(EntityKind::Component, import);
            if graph.has_entity(&to) {
                graph.add_relation(&from, &to, RelationKind::Uses, None);
            }
        }
    }

    for page in &project.pages {
        let from = EntityRef::new(EntityKind::Page, &page.route);
        for name in &page.components {
            let to = EntityRef::new(EntityKind::Component, name);
            if graph.has_entity(&to) {
                graph.add_relation(&from, &to, RelationKind::Uses, None);
            }
        }
        for url in &page.apis {
            if let Some(api) = project.apis.iter().find(|a| a.matches(url)) {
                let to = EntityRef::new(EntityKind::Api, &api.route);
                graph.add_relation(&from, &to, RelationKind::Calls, Some(url.clone()));
            }
        }
    }

    graph
}

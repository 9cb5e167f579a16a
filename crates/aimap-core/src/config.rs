//! Configuration types for an aimap run, loaded from `aimap.yml`.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysers::docker::DockerProject;
use crate::analysers::golang::ProjectDoc;
use crate::analysers::kubernetes::KubeDocs;
use crate::analysers::laravel::LaravelProject;
use crate::analysers::nextjs::NextjsProject;
use crate::analysers::sql::Database;
use crate::analysers::swagger::ApiSpec;
use crate::error::{AimapError, Result};
use crate::graph::entity_graph::Relation;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "aimap.yml";

/// Terminal serialisation format of the generated documentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Markdown,
    Json,
    Yaml,
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Text => "text",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "markdown" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            "yaml" => Some(Self::Yaml),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// File extension used for `documentation.{ext}`.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Text => "txt",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level of detail of the Go report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Short,
    #[default]
    Standard,
    Complete,
}

impl ReportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Standard => "standard",
            Self::Complete => "complete",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "short" => Some(Self::Short),
            "standard" => Some(Self::Standard),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL dialect of a configured connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Postgres,
    Mysql,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "postgres" => Some(Self::Postgres),
            "mysql" => Some(Self::Mysql),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Raw format name; validated into [`OutputFormat`] by [`AimapConfig::validate`].
    #[serde(default)]
    pub format: String,
    #[serde(default = "default_output_path")]
    pub path: String,
}

fn default_output_path() -> String {
    "./docs".to_string()
}

impl OutputConfig {
    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_str_value(&self.format).ok_or_else(|| {
            AimapError::Config(
                "invalid output format (use: html, markdown, json, yaml or text)".to_string(),
            )
        })
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: String::new(),
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    #[serde(default = "default_true")]
    pub show_imports: bool,
    #[serde(default = "default_true")]
    pub show_internal_funcs: bool,
    #[serde(default)]
    pub show_tests: bool,
    #[serde(default = "default_true")]
    pub show_examples: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_imports: true,
            show_internal_funcs: true,
            show_tests: false,
            show_examples: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GolangConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Raw level name; empty means `standard`.
    #[serde(default)]
    pub report_level: String,
    #[serde(default)]
    pub report_options: ReportOptions,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub ignores: Vec<String>,
}

impl GolangConfig {
    pub fn level(&self) -> ReportLevel {
        ReportLevel::from_str_value(&self.report_level).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubernetesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub ignores: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConnection {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub db_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Restrict a Postgres run to a single schema.
    #[serde(default)]
    pub schema: Option<String>,
    /// Deadline applied to every catalog query.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseConnection {
    fn default() -> Self {
        Self {
            name: String::new(),
            db_type: String::new(),
            host: "localhost".to_string(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            schema: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DatabaseConnection {
    pub fn database_type(&self) -> Option<DatabaseType> {
        DatabaseType::from_str_value(&self.db_type)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(config_error("database connection name not specified"));
        }
        if self.database_type().is_none() {
            return Err(config_error("invalid database type (use: postgres or mysql)"));
        }
        if self.host.is_empty() {
            return Err(config_error("database host not specified"));
        }
        if self.port == 0 {
            return Err(config_error("database port not specified"));
        }
        if self.database.is_empty() {
            return Err(config_error("database name not specified"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub connections: Vec<DatabaseConnection>,
}

/// Settings for extractors that take a single project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_project_path")]
    pub path: String,
}

fn default_project_path() -> String {
    ".".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_project_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwaggerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub file: String,
    #[serde(default = "default_swagger_output")]
    pub output: String,
}

fn default_swagger_output() -> String {
    "http-client".to_string()
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: String::new(),
            output: default_swagger_output(),
        }
    }
}

/// Top-level `aimap.yml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AimapConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub golang: GolangConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub databases: DatabasesConfig,
    #[serde(default)]
    pub docker: ProjectConfig,
    #[serde(default)]
    pub laravel: ProjectConfig,
    #[serde(default)]
    pub nextjs: ProjectConfig,
    #[serde(default)]
    pub swagger: SwaggerConfig,
}

fn config_error(msg: &str) -> AimapError {
    AimapError::Config(msg.to_string())
}

impl AimapConfig {
    /// Read, validate and normalise a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let mut cfg: AimapConfig = serde_yaml::from_str(data)?;
        cfg.validate()?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Check required fields and fill the defaults that depend on other fields.
    pub fn validate(&mut self) -> Result<()> {
        if self.output.format.is_empty() {
            return Err(config_error("output format not specified"));
        }
        self.output.output_format()?;
        if self.output.path.is_empty() {
            self.output.path = default_output_path();
        }

        if !self.any_enabled() {
            return Err(config_error(
                "at least one module (golang, kubernetes, databases, docker, laravel, nextjs or swagger) must be enabled",
            ));
        }

        if self.golang.enabled {
            if self.golang.paths.is_empty() {
                return Err(config_error("no paths specified for Go code analysis"));
            }
            if self.golang.report_level.is_empty() {
                self.golang.report_level = ReportLevel::Standard.as_str().to_string();
            }
            if ReportLevel::from_str_value(&self.golang.report_level).is_none() {
                return Err(config_error(
                    "invalid report level (use: short, standard or complete)",
                ));
            }
        }

        if self.kubernetes.enabled && self.kubernetes.paths.is_empty() {
            return Err(config_error(
                "no paths specified for Kubernetes resource analysis",
            ));
        }

        if self.databases.enabled {
            if self.databases.connections.is_empty() {
                return Err(config_error("no database connections configured"));
            }
            for conn in &self.databases.connections {
                conn.validate()?;
            }
        }

        if self.swagger.enabled && self.swagger.file.is_empty() {
            return Err(config_error("no file specified for Swagger analysis"));
        }

        Ok(())
    }

    fn any_enabled(&self) -> bool {
        self.golang.enabled
            || self.kubernetes.enabled
            || self.databases.enabled
            || self.docker.enabled
            || self.laravel.enabled
            || self.nextjs.enabled
            || self.swagger.enabled
    }

    /// Lexically clean every configured path.
    pub fn normalize(&mut self) {
        self.output.path = clean_path(&self.output.path);
        for p in self.golang.paths.iter_mut() {
            *p = clean_path(p);
        }
        for p in self.kubernetes.paths.iter_mut() {
            *p = clean_path(p);
        }
        for project in [&mut self.docker, &mut self.laravel, &mut self.nextjs] {
            project.path = clean_path(&project.path);
        }
        if !self.swagger.file.is_empty() {
            self.swagger.file = clean_path(&self.swagger.file);
        }
    }
}

/// Everything one `generate` run produced, one section per ecosystem.
///
/// A section is `None` (or empty) when its module is disabled or its phase failed.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub version: String,
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golang: Option<ProjectDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubeDocs>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<Database>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerProject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laravel: Option<LaravelProject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nextjs: Option<NextjsProject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swagger: Option<ApiSpec>,
    /// Inferred relations keyed by extractor name.
    pub relations: BTreeMap<String, Vec<Relation>>,
    /// Configuration the run was made with; the Go report reads its level and options.
    #[serde(skip)]
    pub settings: AimapConfig,
}

impl AnalysisResult {
    pub fn new(settings: AimapConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            metadata: BTreeMap::new(),
            golang: None,
            kubernetes: None,
            databases: Vec::new(),
            docker: None,
            laravel: None,
            nextjs: None,
            swagger: None,
            relations: BTreeMap::new(),
            settings,
        }
    }

    pub fn relation_count(&self) -> usize {
        self.relations.values().map(Vec::len).sum()
    }
}

/// Lexical path cleaning: drops `.` segments, folds `..` and trailing separators.
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<Component> = Vec::new();
    for comp in Path::new(path).components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(comp),
            },
            other => parts.push(other),
        }
    }
    let cleaned: PathBuf = parts.iter().collect();
    let s = cleaned.to_string_lossy().replace('\\', "/");
    if s.is_empty() {
        ".".to_string()
    } else {
        s
    }
}

/// Starter configuration written by `aimap init`.
pub fn init_template() -> &'static str {
    r#"# aimap configuration
output:
  format: "markdown" # One of: html, markdown, json, yaml
  path: "./docs"     # Directory where documentation is generated

golang:
  enabled: true
  report_level: "standard"  # One of: short, standard, complete
  report_options:
    show_imports: true
    show_internal_funcs: true
    show_tests: false
    show_examples: true
  paths:
    - "./cmd"
    - "./internal"
    - "./pkg"
  ignores:
    - ".*_test\\.go$"
    - "vendor/.*"
    - "node_modules/.*"

kubernetes:
  enabled: true
  paths:
    - "./deploy"
  ignores:
    - ".*\\.bak$"
    - ".*\\.tmp$"
"#
}

/// Write the starter configuration, refusing to overwrite an existing file.
pub fn write_init_template(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(AimapError::Config(format!(
            "configuration file already exists: {}",
            path.display()
        )));
    }
    std::fs::write(path, init_template())?;
    Ok(())
}

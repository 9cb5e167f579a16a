//! Documentation output: `documentation.{md,json,yaml}` plus `.http` templates.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::analysers::golang::diagram::mermaid_diagram;
use crate::analysers::golang::report::ReportGenerator;
use crate::analysers::{docker, kubernetes, laravel, nextjs, sql, swagger};
use crate::config::{AnalysisResult, OutputConfig, OutputFormat};
use crate::error::{AimapError, Result};

/// Serialise the result in the configured format; returns the file written.
pub fn generate(result: &AnalysisResult, output: &OutputConfig) -> Result<PathBuf> {
    let format = output.output_format()?;
    let content = render(result, format)?;

    std::fs::create_dir_all(&output.path)?;
    let path = Path::new(&output.path).join(format!("documentation.{}", format.extension()));
    std::fs::write(&path, content)?;
    log::info!("documentation written to {}", path.display());

    if let Some(spec) = &result.swagger {
        let dir = Path::new(&output.path).join(&result.settings.swagger.output);
        let files = swagger::http::write_files(spec, &dir)?;
        log::info!("{} request files written to {}", files.len(), dir.display());
    }
    Ok(path)
}

/// Document text for one format. Html and text need a templating layer this crate does not ship.
pub fn render(result: &AnalysisResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(markdown(result)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(result)?),
        OutputFormat::Html | OutputFormat::Text => {
            Err(AimapError::UnsupportedFormat(format.to_string()))
        }
    }
}

pub fn markdown(result: &AnalysisResult) -> String {
    let mut md = String::from("# aimap Documentation\n\n");
    let _ = writeln!(md, "Generated at {}\n", result.generated_at);

    let mut sections: Vec<String> = Vec::new();

    if let Some(project) = &result.golang {
        let mut section = ReportGenerator::new(project, ".", &result.settings.golang).markdown();
        section.push_str("\n## Class Diagram\n\n```mermaid\n");
        section.push_str(&mermaid_diagram(project));
        section.push_str("```\n");
        sections.push(section);
    }
    if let Some(docs) = &result.kubernetes {
        sections.push(kubernetes::report::markdown(docs));
    }
    for db in &result.databases {
        sections.push(sql::plantuml::markdown(db));
    }
    if let Some(project) = &result.docker {
        sections.push(docker::plantuml::markdown(project));
    }
    if let Some(project) = &result.laravel {
        sections.push(laravel::report::markdown(project));
    }
    if let Some(project) = &result.nextjs {
        sections.push(nextjs::report::markdown(project));
    }
    if let Some(spec) = &result.swagger {
        sections.push(swagger::markdown(spec));
    }

    for section in sections {
        // Sections carry their own `#` headings; nest them one level down.
        for line in section.lines() {
            if line.starts_with('#') && !in_fence(&md) {
                md.push('#');
            }
            md.push_str(line);
            md.push('\n');
        }
        md.push('\n');
    }

    if result.relation_count() > 0 {
        md.push_str("## Relations\n\n");
        for (source, relations) in &result.relations {
            if relations.is_empty() {
                continue;
            }
            let _ = writeln!(md, "### {}\n", source);
            for rel in relations {
                let _ = write!(
                    md,
                    "- `{}` {} `{}`",
                    rel.from.name,
                    rel.kind.as_str(),
                    rel.to.name
                );
                if let Some(label) = &rel.label {
                    let _ = write!(md, " ({})", label);
                }
                md.push('\n');
            }
            md.push('\n');
        }
    }
    md
}

/// Whether the text so far ends inside a fenced code block.
fn in_fence(md: &str) -> bool {
    md.lines().filter(|l| l.starts_with("```")).count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysers::docker::DockerProject;
    use crate::config::AimapConfig;
    use crate::graph::entity_graph::{EntityKind, EntityRef, Relation, RelationKind};
    use pretty_assertions::assert_eq;

    fn result() -> AnalysisResult {
        let mut result = AnalysisResult::new(AimapConfig::default());
        result.docker = Some(DockerProject {
            name: "shop".into(),
            ..Default::default()
        });
        result.relations.insert(
            "kubernetes".into(),
            vec![Relation {
                from: EntityRef::scoped(EntityKind::Service, "default", "api"),
                to: EntityRef::scoped(EntityKind::Deployment, "default", "api"),
                kind: RelationKind::Selects,
                label: None,
            }],
        );
        result
    }

    #[test]
    fn markdown_nests_sections_and_lists_relations() {
        let md = markdown(&result());
        assert!(md.starts_with("# aimap Documentation\n\nGenerated at "));
        assert!(md.contains("\n## Docker Project: shop\n"));
        assert!(md.contains("```plantuml\n@startuml\n"));
        assert!(md.contains("## Relations\n\n### kubernetes\n\n- `api` selects `api`\n"));
    }

    #[test]
    fn html_and_text_are_unsupported() {
        for format in [OutputFormat::Html, OutputFormat::Text] {
            let err = render(&result(), format).unwrap_err();
            assert!(matches!(err, AimapError::UnsupportedFormat(_)));
        }
    }

    #[test]
    fn json_omits_disabled_sections() {
        let json = render(&result(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["docker"]["name"], "shop");
        assert!(value.get("golang").is_none());
        assert!(value.get("settings").is_none());
        assert_eq!(value["relations"]["kubernetes"][0]["kind"], "selects");
    }

    #[test]
    fn generate_writes_documentation_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            format: "yaml".into(),
            path: dir.path().join("docs").to_string_lossy().to_string(),
        };
        let path = generate(&result(), &output).unwrap();
        assert!(path.ends_with("documentation.yaml"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("name: shop"));
    }
}

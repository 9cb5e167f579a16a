//! Pipeline orchestration and end-to-end documentation generation.

mod common;

use common::*;

use aimap_core::config::{AimapConfig, OutputFormat};
use aimap_core::output;
use aimap_core::pipeline::{self, ProgressCallback};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn config_yaml(output_dir: &str, format: &str) -> String {
    format!(
        r#"
output:
  format: {format}
  path: {output_dir}
golang:
  enabled: true
  report_level: standard
  paths:
    - {go}
  ignores:
    - _test\.go$
kubernetes:
  enabled: true
  paths:
    - {kube}
  ignores:
    - generated
docker:
  enabled: true
  path: {docker}
laravel:
  enabled: true
  path: {laravel}
nextjs:
  enabled: true
  path: {nextjs}
swagger:
  enabled: true
  file: {swagger}
  output: requests
"#,
        go = fixture_str("go_store"),
        kube = fixture_str("kube_manifests"),
        docker = fixture_str("docker_shop"),
        laravel = fixture_str("laravel_blog"),
        nextjs = fixture_str("nextjs_shop"),
        swagger = fixture_str("swagger/petstore.json"),
    )
}

fn load(output_dir: &str, format: &str) -> AimapConfig {
    AimapConfig::from_yaml(&config_yaml(output_dir, format)).unwrap()
}

// ===========================================================================
// Pipeline orchestration
// ===========================================================================

#[test]
fn pipeline_runs_every_enabled_phase() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(&dir.path().to_string_lossy(), "markdown");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let progress: ProgressCallback = {
        let seen = seen.clone();
        Box::new(move |phase, _label| seen.borrow_mut().push(phase.to_string()))
    };
    let result = pipeline::run_pipeline(&config, Some(progress)).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec!["golang", "kubernetes", "docker", "laravel", "nextjs", "swagger"]
    );
    assert!(result.golang.is_some());
    assert!(result.kubernetes.is_some());
    assert!(result.docker.is_some());
    assert!(result.laravel.is_some());
    assert!(result.nextjs.is_some());
    assert!(result.swagger.is_some());
    assert!(result.databases.is_empty());
    assert!(result.metadata.get("failed_phases").is_none());
}

#[test]
fn relations_are_grouped_by_extractor() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline::run_pipeline(&load(&dir.path().to_string_lossy(), "json"), None).unwrap();

    let sources: Vec<&str> = result.relations.keys().map(String::as_str).collect();
    assert_eq!(
        sources,
        vec!["docker", "golang", "kubernetes", "laravel", "nextjs", "swagger"]
    );
    assert!(result.relation_count() > 0);
    assert_eq!(
        result.relation_count(),
        result.relations.values().map(Vec::len).sum::<usize>()
    );
}

#[test]
fn pipeline_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline::run_pipeline(&load(&dir.path().to_string_lossy(), "json"), None).unwrap();

    let timings = result.metadata["phase_timings"].as_object().unwrap();
    assert_eq!(timings.len(), 6);
    assert!(result.metadata["total_ms"].as_f64().unwrap() >= 0.0);
    assert!(!result.generated_at.is_empty());
}

#[test]
fn broken_phase_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = load(&dir.path().to_string_lossy(), "json");
    config.laravel.path = dir.path().join("missing").to_string_lossy().to_string();

    let result = pipeline::run_pipeline(&config, None).unwrap();
    assert!(result.laravel.is_none());
    assert!(result.nextjs.is_some());
    assert_eq!(
        result.metadata["failed_phases"],
        serde_json::json!(["laravel"])
    );
    assert!(!result.relations.contains_key("laravel"));
}

// ===========================================================================
// End-to-end output
// ===========================================================================

#[test]
fn markdown_documentation_with_request_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("docs");
    let config = load(&out.to_string_lossy(), "markdown");

    let result = pipeline::run_pipeline(&config, None).unwrap();
    let written = output::generate(&result, &config.output).unwrap();
    assert_eq!(written, out.join("documentation.md"));

    let md = std::fs::read_to_string(&written).unwrap();
    assert!(md.starts_with("# aimap Documentation\n"));
    for heading in [
        "\n## Project Documentation\n",
        "\n## Kubernetes Infrastructure\n",
        "\n## Docker Project: docker_shop\n",
        "\n## Laravel Project: laravel_blog\n",
        "\n## API: Petstore\n",
        "\n## Relations\n",
    ] {
        assert!(md.contains(heading), "missing {heading:?}");
    }

    assert!(out.join("requests/pets.http").is_file());
    assert!(out.join("requests/default.http").is_file());
}

#[test]
fn json_documentation_round_trips_sections() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(&dir.path().to_string_lossy(), "json");
    assert_eq!(config.output.output_format().unwrap(), OutputFormat::Json);

    let result = pipeline::run_pipeline(&config, None).unwrap();
    let written = output::generate(&result, &config.output).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
    assert_eq!(value["docker"]["name"], "docker_shop");
    assert_eq!(value["swagger"]["info"]["title"], "Petstore");
    assert!(value.get("databases").is_none());
    assert!(!value["relations"]["laravel"].as_array().unwrap().is_empty());
}

#[test]
fn html_output_is_rejected_at_generation() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(&dir.path().to_string_lossy(), "html");
    let result = pipeline::run_pipeline(&config, None).unwrap();
    assert!(output::generate(&result, &config.output).is_err());
}

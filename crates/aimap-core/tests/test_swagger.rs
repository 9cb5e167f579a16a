//! Swagger/OpenAPI loading and `.http` template generation from a file.

mod common;

use common::*;

use aimap_core::analysers::swagger::{self, http, SwaggerParser};
use aimap_core::analysers::Extractor;
use aimap_core::error::AimapError;
use aimap_core::graph::entity_graph::RelationKind;
use pretty_assertions::assert_eq;

#[test]
fn parses_fixture_description() {
    let spec = SwaggerParser::new(fixture_path("swagger/petstore.json"))
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(spec.info.title, "Petstore");
    assert_eq!(spec.base_url(), "https://petstore.example.com/v1");
    assert_eq!(spec.endpoints().len(), 3);

    let groups = spec.endpoints_by_tag();
    let tags: Vec<&str> = groups.keys().map(String::as_str).collect();
    assert_eq!(tags, vec!["Pets", "default"]);
}

#[test]
fn writes_request_files_per_tag() {
    let spec = SwaggerParser::new(fixture_path("swagger/petstore.json"))
        .unwrap()
        .parse()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let files = http::write_files(&spec, dir.path()).unwrap();

    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["pets.http", "default.http"]);

    let pets = std::fs::read_to_string(&files[0]).unwrap();
    assert!(pets.starts_with("### Pets Endpoints\n\n@baseUrl = https://petstore.example.com/v1\n"));
    assert!(pets.contains("GET {{baseUrl}}/pets?limit={{limit}}\n"));
    assert!(pets.contains("\"name\": \"Rex\""));
    assert!(pets.contains("\"born\": \"2024-01-01\""));

    let health = std::fs::read_to_string(&files[1]).unwrap();
    assert!(health.contains("# @name get_health\nGET {{baseUrl}}/health\n"));
    assert!(!health.contains("Authorization"));
}

#[test]
fn graph_groups_endpoints_under_tags() {
    let spec = SwaggerParser::new(fixture_path("swagger/petstore.json"))
        .unwrap()
        .parse()
        .unwrap();
    let graph = <SwaggerParser as Extractor>::build_graph(&spec);
    let contained = pairs(&graph, RelationKind::Contains);
    assert_eq!(contained.len(), 3);
    assert!(contained.contains(&("tag/Pets".to_string(), "POST /pets".to_string())));

    let md = swagger::markdown(&spec);
    assert!(md.contains("| POST | `/pets` | createPet | Create a pet |"));
}

#[test]
fn invalid_json_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "broken.json", "{ not json");
    let err = SwaggerParser::new(dir.path().join("broken.json"))
        .unwrap()
        .parse()
        .unwrap_err();
    match err {
        AimapError::Parse { path, .. } => assert!(path.ends_with("broken.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_version_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "plain.json", r#"{"paths": {}}"#);
    let err = SwaggerParser::new(dir.path().join("plain.json"))
        .unwrap()
        .parse()
        .unwrap_err();
    assert!(matches!(err, AimapError::InvalidSpec(_)));
}

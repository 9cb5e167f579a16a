//! Laravel extraction over a small blog application.

mod common;

use common::*;

use aimap_core::analysers::laravel::{self, LaravelAnalyser, LaravelProject, RelationshipType};
use aimap_core::analysers::Extractor;
use aimap_core::graph::entity_graph::{EntityKind, EntityRef, RelationKind};
use pretty_assertions::assert_eq;

fn analyse() -> LaravelProject {
    LaravelAnalyser::new(fixture_path("laravel_blog"))
        .unwrap()
        .analyse()
        .unwrap()
}

#[test]
fn models_with_attributes_and_relationships() {
    let project = analyse();
    let names: Vec<&str> = project.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Post", "User"]);

    let post = &project.models[0];
    assert_eq!(post.table.as_deref(), Some("blog_posts"));
    assert_eq!(post.fillable, vec!["title", "body", "user_id"]);

    let author = &post.relationships[0];
    assert_eq!(author.kind, RelationshipType::BelongsTo);
    assert_eq!(author.related_model, "User");
    assert_eq!(author.foreign_key.as_deref(), Some("user_id"));

    let tags = &post.relationships[1];
    assert_eq!(tags.kind, RelationshipType::BelongsToMany);
    assert_eq!(tags.pivot_table.as_deref(), Some("post_tag"));

    let user = &project.models[1];
    assert_eq!(user.hidden, vec!["password", "remember_token"]);
    assert_eq!(user.casts[0].field, "email_verified_at");
    assert_eq!(user.casts[0].cast_type, "datetime");
}

#[test]
fn base_controller_is_skipped() {
    let project = analyse();
    assert_eq!(project.controllers.len(), 1);

    let controller = &project.controllers[0];
    assert_eq!(controller.name, "PostController");
    assert_eq!(controller.middleware, vec!["auth"]);
    assert_eq!(controller.models, vec!["Post"]);
    let methods: Vec<&str> = controller.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["index", "store"]);
    assert_eq!(controller.methods[1].return_type.as_deref(), Some("Post"));
}

#[test]
fn routes_from_both_files() {
    let project = analyse();
    let routes: Vec<(String, &str)> = project
        .routes
        .iter()
        .map(|r| (r.label(), r.source.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("GET /posts".to_string(), "web"),
            ("GET /posts".to_string(), "api"),
            ("POST /posts".to_string(), "api"),
        ]
    );
    assert_eq!(project.routes[0].name.as_deref(), Some("posts.index"));
    assert_eq!(project.routes[2].action.as_deref(), Some("store"));
    assert_eq!(project.routes[2].middleware, vec!["auth:sanctum"]);
}

#[test]
fn migration_columns_and_foreign_keys() {
    let project = analyse();
    let migration = &project.migrations[0];
    assert_eq!(migration.timestamp, "2024_01_15_120000");
    assert_eq!(migration.name, "create_posts_table");
    assert_eq!(migration.table, "blog_posts");

    let columns: Vec<&str> = migration.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        columns,
        vec!["id", "title", "body", "user_id", "created_at", "updated_at"]
    );
    assert!(migration.columns[2].nullable);

    let reference = migration.columns[3].references.as_ref().unwrap();
    assert_eq!(reference.table, "users");
    assert_eq!(reference.column, "id");
    assert_eq!(reference.on_delete.as_deref(), Some("cascade"));
}

#[test]
fn graph_deduplicates_routes_and_keeps_unknown_models() {
    let graph = <LaravelAnalyser as Extractor>::build_graph(&analyse());

    assert_eq!(graph.entities_of_kind(EntityKind::Route).len(), 2);
    assert_eq!(
        pairs(&graph, RelationKind::Controls),
        vec![("PostController".to_string(), "Post".to_string())]
    );

    let tag = EntityRef::new(EntityKind::Model, "Tag");
    assert_eq!(graph.dangling(), vec![&tag]);
    assert_eq!(
        pairs(&graph, RelationKind::BelongsToMany),
        vec![("Post".to_string(), "Tag".to_string())]
    );
}

#[test]
fn diagram_and_markdown() {
    let project = analyse();
    let puml = laravel::report::render(&project);
    assert!(puml.starts_with("@startuml"));

    let md = laravel::report::markdown(&project);
    assert!(md.starts_with("# Laravel Project: laravel_blog\n"));
}

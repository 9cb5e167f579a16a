//! aimap core: project documentation extracted from source and infrastructure artifacts.
//!
//! This crate contains all analysis logic: per-ecosystem extractors (Go, Docker,
//! Kubernetes, SQL catalogs, Laravel, Next.js, Swagger/OpenAPI), relationship
//! inference over the extracted entities, diagram rendering and output generation.

pub mod analysers;
pub mod config;
pub mod error;
pub mod graph;
pub mod ignore;
pub mod output;
pub mod phases;
pub mod pipeline;
pub mod render;

//! Analysis phases, one per ecosystem, run in order by the pipeline.

pub mod databases;
pub mod docker;
pub mod golang;
pub mod kubernetes;
pub mod laravel;
pub mod nextjs;
pub mod swagger;

use crate::analysers::Extractor;
use crate::config::AnalysisResult;
use crate::error::Result;

/// Run an extractor and record the relations inferred from its output.
pub(crate) fn extract<E: Extractor>(
    extractor: &mut E,
    result: &mut AnalysisResult,
) -> Result<E::Output> {
    let output = extractor.extract()?;
    let graph = E::build_graph(&output);

    let dangling = graph.dangling();
    if !dangling.is_empty() {
        log::debug!(
            "{}: {} relation targets were not extracted",
            extractor.name(),
            dangling.len()
        );
    }
    log::info!(
        "{}: {} entities, {} relations",
        extractor.name(),
        graph.entity_count(),
        graph.relation_count()
    );

    result
        .relations
        .entry(extractor.name().to_string())
        .or_default()
        .extend(graph.relations());
    Ok(output)
}

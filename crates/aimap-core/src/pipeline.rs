//! Sequential phase orchestrator with timing.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;
use crate::phases;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("golang", "Documenting Go packages"),
    ("kubernetes", "Mapping Kubernetes resources"),
    ("databases", "Reading database catalogs"),
    ("docker", "Reading Docker manifests"),
    ("laravel", "Scanning Laravel project"),
    ("nextjs", "Scanning Next.js project"),
    ("swagger", "Loading API description"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

type PhaseFn = fn(&AimapConfig, &mut AnalysisResult) -> Result<()>;

/// Phases in execution order.
const PHASES: &[(&str, PhaseFn)] = &[
    ("golang", phases::golang::run_golang_phase),
    ("kubernetes", phases::kubernetes::run_kubernetes_phase),
    ("databases", phases::databases::run_databases_phase),
    ("docker", phases::docker::run_docker_phase),
    ("laravel", phases::laravel::run_laravel_phase),
    ("nextjs", phases::nextjs::run_nextjs_phase),
    ("swagger", phases::swagger::run_swagger_phase),
];

fn is_enabled(config: &AimapConfig, phase: &str) -> bool {
    match phase {
        "golang" => config.golang.enabled,
        "kubernetes" => config.kubernetes.enabled,
        "databases" => config.databases.enabled,
        "docker" => config.docker.enabled,
        "laravel" => config.laravel.enabled,
        "nextjs" => config.nextjs.enabled,
        "swagger" => config.swagger.enabled,
        _ => false,
    }
}

/// Names of the phases a configuration would run, in order.
pub fn enabled_phases(config: &AimapConfig) -> Vec<&'static str> {
    PHASES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| is_enabled(config, name))
        .collect()
}

/// Execute every enabled phase and return the combined result.
///
/// A failing phase is logged and its section left empty; later phases still run.
pub fn run_pipeline(
    config: &AimapConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new(config.clone());
    let mut timings: BTreeMap<String, f64> = BTreeMap::new();
    let mut failed: Vec<String> = Vec::new();
    let total_start = Instant::now();

    for &(name, phase_fn) in PHASES {
        if !is_enabled(config, name) {
            continue;
        }
        if let Some(ref mut cb) = progress_callback {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }

        let start = Instant::now();
        if let Err(e) = phase_fn(config, &mut result) {
            log::error!("{} phase failed: {}", name, e);
            failed.push(name.to_string());
        }
        timings.insert(name.to_string(), start.elapsed().as_secs_f64());
    }

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    result
        .metadata
        .insert("phase_timings".to_string(), serde_json::json!(timings));
    result
        .metadata
        .insert("total_ms".to_string(), serde_json::json!(total_ms));
    if !failed.is_empty() {
        result
            .metadata
            .insert("failed_phases".to_string(), serde_json::json!(failed));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn enabled_phases_follow_fixed_order() {
        let mut config = AimapConfig::default();
        config.swagger.enabled = true;
        config.docker.enabled = true;
        config.golang.enabled = true;
        assert_eq!(enabled_phases(&config), vec!["golang", "docker", "swagger"]);
    }

    #[test]
    fn every_phase_has_a_label() {
        for &(name, _) in PHASES {
            assert!(PHASE_LABELS.iter().any(|(n, _)| *n == name), "{name}");
        }
    }

    #[test]
    fn failed_phase_leaves_section_empty() {
        let mut config = AimapConfig::default();
        config.docker.enabled = true;
        config.docker.path = "/definitely/not/here".to_string();

        let calls = Rc::new(Cell::new(0));
        let progress: ProgressCallback = {
            let calls = calls.clone();
            Box::new(move |_name, _label| calls.set(calls.get() + 1))
        };
        let result = run_pipeline(&config, Some(progress)).unwrap();

        assert_eq!(calls.get(), 1);
        assert!(result.docker.is_none());
        assert_eq!(
            result.metadata["failed_phases"],
            serde_json::json!(["docker"])
        );
        assert!(result.metadata["phase_timings"].get("docker").is_some());
    }
}

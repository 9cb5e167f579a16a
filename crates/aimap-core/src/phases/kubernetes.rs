//! Phase 2: Decode Kubernetes manifests and infer selector, routing and namespace edges.

use crate::analysers::kubernetes::KubernetesAnalyser;
use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;

pub fn run_kubernetes_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    let mut analyser = KubernetesAnalyser::new(&config.kubernetes);
    result.kubernetes = Some(super::extract(&mut analyser, result)?);
    Ok(())
}

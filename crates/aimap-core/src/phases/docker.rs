//! Phase 4: Dockerfiles and the compose file of the project root.

use crate::analysers::docker::DockerAnalyser;
use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;

pub fn run_docker_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    let mut analyser = DockerAnalyser::new(&config.docker.path)?;
    result.docker = Some(super::extract(&mut analyser, result)?);
    Ok(())
}

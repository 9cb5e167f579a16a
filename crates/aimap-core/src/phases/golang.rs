//! Phase 1: Parse Go packages under the configured paths.

use crate::analysers::golang::GoAnalyser;
use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;

pub fn run_golang_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    let mut analyser = GoAnalyser::new(&config.golang);
    result.golang = Some(super::extract(&mut analyser, result)?);
    Ok(())
}

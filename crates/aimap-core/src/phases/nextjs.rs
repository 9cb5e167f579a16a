//! Phase 6: Next.js components, pages, layouts, state modules and API routes.

use crate::analysers::nextjs::NextjsAnalyser;
use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;

pub fn run_nextjs_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    let mut analyser = NextjsAnalyser::new(&config.nextjs.path)?;
    result.nextjs = Some(super::extract(&mut analyser, result)?);
    Ok(())
}

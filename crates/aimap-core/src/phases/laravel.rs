//! Phase 5: Laravel models, controllers, routes and migrations.

use crate::analysers::laravel::LaravelAnalyser;
use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;

pub fn run_laravel_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    let mut analyser = LaravelAnalyser::new(&config.laravel.path)?;
    result.laravel = Some(super::extract(&mut analyser, result)?);
    Ok(())
}

//! Phase 7: Load the Swagger/OpenAPI description.

use crate::analysers::swagger::SwaggerParser;
use crate::config::{AimapConfig, AnalysisResult};
use crate::error::Result;

pub fn run_swagger_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    let mut parser = SwaggerParser::new(&config.swagger.file)?;
    result.swagger = Some(super::extract(&mut parser, result)?);
    Ok(())
}

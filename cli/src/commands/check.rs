//! `threetier check`: run topology checks against the declaration.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::{config_service, synth_service};

/// Run the check command. Exits with failure when any check fails;
/// warnings alone do not fail.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the declaration fails.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let synthesis = synth_service::synthesize_stack(&config)?;
    app.renderer().render_checks(&synthesis.report)?;
    if synthesis.report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

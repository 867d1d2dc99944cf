//! `threetier plan`: show provisioning and teardown order.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::{config_service, plan_service, synth_service};

/// Run the plan command.
///
/// # Errors
///
/// Returns an error if the declaration is invalid or its graph has a cycle.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let synthesis = synth_service::synthesize_stack(&config)?;
    let plan = plan_service::plan(&synthesis.template)?;
    app.renderer().render_plan(&plan)?;
    Ok(ExitCode::SUCCESS)
}

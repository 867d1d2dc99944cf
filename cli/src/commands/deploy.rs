//! `threetier deploy`: rehearse the deployment against the local engine.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::{config_service, deploy_service};
use crate::output::{Reporter, TerminalReporter, progress};

/// Run the deploy command.
///
/// # Errors
///
/// Returns an error if a check fails, provisioning fails, or state cannot be
/// saved.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;

    let spinner = (!app.is_json() && app.output.show_progress())
        .then(|| progress::spinner(&format!("Deploying {}...", config.stack_name)));
    let reporter = match &spinner {
        Some(pb) => Reporter::Terminal(TerminalReporter::with_spinner(&app.output, pb.clone())),
        None => app.reporter(),
    };

    let result = deploy_service::deploy(&app.engine, &app.state_mgr, &config, &reporter).await;
    if let Some(pb) = &spinner {
        match &result {
            Ok(_) => progress::finish_ok(pb, &format!("{} deployed", config.stack_name)),
            Err(_) => progress::finish_error(pb),
        }
    }

    app.renderer().render_deploy(&result?)?;
    Ok(ExitCode::SUCCESS)
}

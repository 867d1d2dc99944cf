//! `threetier destroy`: tear down the recorded deployment.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::teardown_service;
use crate::output::{Reporter, TerminalReporter, progress};

/// Arguments for the destroy command.
#[derive(Args)]
pub struct DestroyArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Run the destroy command.
///
/// # Errors
///
/// Returns an error if nothing is deployed, a resource is deletion-protected,
/// or the engine fails.
pub async fn run(app: &AppContext, args: &DestroyArgs) -> Result<ExitCode> {
    let record = teardown_service::recorded(&app.state_mgr).await?;

    if !args.yes && !app.non_interactive {
        if !app.is_json() && !app.output.quiet {
            println!();
            app.output.kv("Stack:", &record.stack_name);
            app.output
                .kv("Resources:", &record.resources.len().to_string());
            println!();
        }
        if !app.confirm(&format!("Destroy {}?", record.stack_name), false)? {
            app.output.info("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let spinner = (!app.is_json() && app.output.show_progress())
        .then(|| progress::spinner(&format!("Destroying {}...", record.stack_name)));
    let reporter = match &spinner {
        Some(pb) => Reporter::Terminal(TerminalReporter::with_spinner(&app.output, pb.clone())),
        None => app.reporter(),
    };

    let result = teardown_service::destroy(&app.engine, &app.state_mgr, &reporter).await;
    if let Some(pb) = &spinner {
        match &result {
            Ok(_) => progress::finish_ok(pb, &format!("{} destroyed", record.stack_name)),
            Err(_) => progress::finish_error(pb),
        }
    }

    app.renderer()
        .render_teardown(&record.stack_name, &result?)?;
    Ok(ExitCode::SUCCESS)
}

//! `threetier synth`: write the CloudFormation template.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::{config_service, synth_service};
use crate::infra::template_store::{DEFAULT_OUT_DIR, FileTemplateStore};

/// Arguments for the synth command.
#[derive(Args)]
pub struct SynthArgs {
    /// Directory the template is written to
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Print the template to stdout instead of writing it
    #[arg(long)]
    pub stdout: bool,
}

/// Run the synth command.
///
/// # Errors
///
/// Returns an error if the config is invalid or the template cannot be written.
pub fn run(app: &AppContext, args: &SynthArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let synthesis = synth_service::synthesize_stack(&config)?;
    if synthesis.report.has_failures() {
        app.renderer().render_check_failure(&synthesis.report)?;
        return Ok(ExitCode::FAILURE);
    }

    if args.stdout {
        let json = synthesis
            .template
            .to_json_pretty()
            .context("cannot serialize template")?;
        println!("{json}");
        return Ok(ExitCode::SUCCESS);
    }

    let store = FileTemplateStore::new(args.out.clone());
    let path = synth_service::write_stack(&store, &config.stack_name.0, &synthesis)?;
    app.renderer().render_synth(&synthesis, &path)?;
    Ok(ExitCode::SUCCESS)
}

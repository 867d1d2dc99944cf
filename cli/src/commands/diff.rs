//! `threetier diff`: compare the declaration to a synthesized template.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::TemplateStore;
use crate::application::services::{config_service, synth_service};
use crate::domain::diff::diff;
use crate::infra::template_store::FileTemplateStore;

/// Arguments for the diff command.
#[derive(Args)]
pub struct DiffArgs {
    /// Previously synthesized template to compare against
    #[arg(long)]
    pub against: PathBuf,
}

/// Run the diff command.
///
/// # Errors
///
/// Returns an error if either template cannot be produced or read.
pub fn run(app: &AppContext, args: &DiffArgs) -> Result<ExitCode> {
    let previous = FileTemplateStore::default().read_template(&args.against)?;
    let config = config_service::load_config(&app.config_store)?;
    let synthesis = synth_service::synthesize_stack(&config)?;
    let changes = diff(&previous, &synthesis.template);
    app.renderer().render_diff(&changes)?;
    Ok(ExitCode::SUCCESS)
}

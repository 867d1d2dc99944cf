//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Declare, check and rehearse a three-tier AWS stack
#[derive(Parser)]
#[command(
    name = "threetier",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./threetier.yaml)
    #[arg(long, global = true, env = "THREETIER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Synthesize the CloudFormation template
    Synth(commands::synth::SynthArgs),

    /// Show provisioning and teardown order
    Plan,

    /// Run topology checks
    Check,

    /// Compare the declaration to a synthesized template
    Diff(commands::diff::DiffArgs),

    /// Rehearse deployment against the local engine
    Deploy,

    /// Tear down the recorded deployment
    Destroy(commands::destroy::DestroyArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let app = AppContext::new(&AppFlags {
            no_color: self.no_color,
            quiet: self.quiet,
            json: self.json,
            config: self.config,
        });
        match self.command {
            Command::Synth(args) => commands::synth::run(&app, &args),
            Command::Plan => commands::plan::run(&app),
            Command::Check => commands::check::run(&app),
            Command::Diff(args) => commands::diff::run(&app, &args),
            Command::Deploy => commands::deploy::run(&app).await,
            Command::Destroy(args) => commands::destroy::run(&app, &args).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}

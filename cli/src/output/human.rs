//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::deploy_service::DeployOutcome;
use crate::application::services::plan_service::Plan;
use crate::application::services::synth_service::Synthesis;
use crate::domain::checks::{Check, CheckReport, CheckStatus};
use crate::domain::config::{StackConfig, VALID_CONFIG_KEYS};
use crate::domain::deployment::TeardownOutcome;
use crate::domain::diff::{Change, ChangeKind, ChangeSet};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("threetier {version}");
        }
    }

    /// Render the current stack configuration.
    pub fn render_config(&self, config: &StackConfig, path: &Path) {
        if self.ctx.quiet {
            return;
        }
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<32} {}", "stack_name:", config.stack_name);
        for key in VALID_CONFIG_KEYS {
            let value = config.get(key).unwrap_or_default();
            println!("  {:<32} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["THREETIER_CONFIG", "THREETIER_STATE", "NO_COLOR"] {
            println!(
                "    {:<30} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }

    /// Render the synthesis summary and any check warnings.
    pub fn render_synth(&self, synthesis: &Synthesis, path: &Path) {
        for warning in synthesis.report.warnings() {
            self.ctx.warn(&format!("{}: {}", warning.name, warning.detail));
        }
        self.ctx.success(&format!(
            "Synthesized {} resources to {}",
            synthesis.template.resources.len(),
            path.display()
        ));
        self.ctx.kv("digest:", &synthesis.digest);
    }

    /// Render the provisioning and teardown order.
    pub fn render_plan(&self, plan: &Plan) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!(
            "Provisioning order ({} resources, {} layers)",
            plan.provisioning.len(),
            plan.layers
        ));
        println!();
        let width = plan
            .provisioning
            .iter()
            .map(|s| s.logical_id.len())
            .max()
            .unwrap_or(0);
        for step in &plan.provisioning {
            println!(
                "  {:>3}. {:<width$}  {}",
                step.position,
                step.logical_id,
                step.resource_type.style(self.ctx.styles.resource_type),
            );
            if !step.depends_on.is_empty() {
                println!(
                    "       {}",
                    format!("after {}", step.depends_on.join(", ")).style(self.ctx.styles.dim)
                );
            }
        }
        println!();
        self.ctx.header("Teardown order");
        println!();
        for (i, id) in plan.teardown.iter().enumerate() {
            println!("  {:>3}. {id}", i + 1);
        }
        println!();
    }

    /// Render check results with a summary line.
    pub fn render_checks(&self, report: &CheckReport) {
        if self.ctx.quiet && !report.has_failures() {
            return;
        }
        println!();
        self.ctx.header("Topology checks");
        println!();
        for check in &report.checks {
            self.print_check(check);
        }
        println!();
        let failures = report.failures().len();
        let warnings = report.warnings().len();
        if failures == 0 {
            self.ctx.success(&format!(
                "{} checks passed{}",
                report.checks.len() - warnings,
                plural_suffix(warnings, "warning")
            ));
        } else {
            self.ctx.error(&format!(
                "{failures} of {} checks failed",
                report.checks.len()
            ));
        }
    }

    /// Render a template diff.
    pub fn render_diff(&self, changes: &ChangeSet) {
        if changes.is_empty() {
            self.ctx.success("no changes");
            return;
        }
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header("Resources");
        println!();
        for change in &changes.changes {
            self.print_change(change);
        }
        if !changes.outputs.is_empty() {
            println!();
            self.ctx.header("Outputs");
            println!();
            for name in &changes.outputs {
                println!("    {} {name}", "~".style(self.ctx.styles.warning));
            }
        }
        println!();
        let replacements = changes.replacements().len();
        self.ctx.info(&format!(
            "{} to add, {} to change, {} to remove{}",
            changes.count(ChangeKind::Added),
            changes.count(ChangeKind::Modified),
            changes.count(ChangeKind::Removed),
            plural_suffix(replacements, "replacement"),
        ));
    }

    /// Render the outcome of a deploy.
    pub fn render_deploy(&self, outcome: &DeployOutcome) {
        if self.ctx.quiet {
            return;
        }
        let record = outcome.record();
        match outcome {
            DeployOutcome::Created { .. } => self.ctx.success(&format!(
                "Created {} ({} resources)",
                record.stack_name,
                record.resources.len()
            )),
            DeployOutcome::Updated { changes, .. } => {
                self.render_diff(changes);
                self.ctx.success(&format!("Updated {}", record.stack_name));
            }
            DeployOutcome::Unchanged { .. } => {
                self.ctx
                    .info(&format!("{} is up to date", record.stack_name));
            }
        }
        println!();
        self.ctx.header("Application environment");
        for (name, value) in record.environment_variables() {
            self.ctx.kv(&format!("{name:<20}"), value);
        }
        if !record.outputs.is_empty() {
            println!();
            self.ctx.header("Outputs");
            for (name, value) in &record.outputs {
                self.ctx.kv(&format!("{name:<20}"), value);
            }
        }
        println!();
    }

    /// Render the outcome of a teardown.
    pub fn render_teardown(&self, stack_name: &str, outcome: &TeardownOutcome) {
        self.ctx.success(&format!(
            "Destroyed {stack_name} ({} resources deleted)",
            outcome.deleted.len()
        ));
        for id in &outcome.snapshots {
            self.ctx.info(&format!("final snapshot kept for {id}"));
        }
        for id in &outcome.retained {
            self.ctx.warn(&format!("{id} retained; delete it manually"));
        }
    }

    fn print_check(&self, check: &Check) {
        let mark = match check.status {
            CheckStatus::Pass => "✓".style(self.ctx.styles.success).to_string(),
            CheckStatus::Warn => "!".style(self.ctx.styles.warning).to_string(),
            CheckStatus::Fail => "✗".style(self.ctx.styles.error).to_string(),
        };
        println!("    {mark} {:<24} {}", check.name, check.detail);
    }

    fn print_change(&self, change: &Change) {
        let mark = match change.kind {
            ChangeKind::Added => "+".style(self.ctx.styles.success).to_string(),
            ChangeKind::Removed => "-".style(self.ctx.styles.error).to_string(),
            ChangeKind::Modified => "~".style(self.ctx.styles.warning).to_string(),
        };
        let replace = if change.replacement {
            format!(" {}", "(replacement)".style(self.ctx.styles.error))
        } else {
            String::new()
        };
        println!(
            "    {mark} {} {}{replace}",
            change.logical_id,
            change.resource_type.style(self.ctx.styles.resource_type)
        );
        for property in &change.changed_properties {
            println!("        {}", property.style(self.ctx.styles.dim));
        }
    }
}

/// `", 2 warnings"`, `", 1 warning"` or `""`.
#[must_use]
pub fn plural_suffix(count: usize, noun: &str) -> String {
    match count {
        0 => String::new(),
        1 => format!(", 1 {noun}"),
        n => format!(", {n} {noun}s"),
    }
}

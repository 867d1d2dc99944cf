//! Application service: declare, synthesize and check the stack.

use std::path::PathBuf;

use anyhow::Result;
use threetier_common::Template;

use crate::application::ports::TemplateStore;
use crate::domain::checks::{CheckReport, run_checks};
use crate::domain::config::StackConfig;
use crate::domain::error::DeploymentError;
use crate::domain::stack;
use crate::domain::synth::{synthesize, template_digest};

/// A synthesized template together with its check results.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub template: Template,
    pub report: CheckReport,
    pub digest: String,
}

impl Synthesis {
    /// # Errors
    ///
    /// Returns `DeploymentError::ChecksFailed` if any check failed.
    pub fn ensure_valid(&self) -> Result<()> {
        let failures = self.report.failures();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeploymentError::ChecksFailed(failures.len()).into())
        }
    }
}

/// Run the declaration pass and the topology checks.
///
/// # Errors
///
/// Returns an error if the config is invalid or a declaration fails.
pub fn synthesize_stack(config: &StackConfig) -> Result<Synthesis> {
    let topology = stack::declare(config)?;
    let template = synthesize(&topology);
    let report = run_checks(&template, config);
    let digest = template_digest(&template);
    tracing::debug!(
        resources = template.resources.len(),
        digest = %digest,
        "stack synthesized"
    );
    for warning in report.warnings() {
        tracing::debug!(check = warning.name, "{}", warning.detail);
    }
    Ok(Synthesis {
        template,
        report,
        digest,
    })
}

/// Write a synthesized template, refusing when checks failed.
///
/// # Errors
///
/// Returns an error if a check failed or writing fails.
pub fn write_stack(
    store: &impl TemplateStore,
    stack_name: &str,
    synthesis: &Synthesis,
) -> Result<PathBuf> {
    synthesis.ensure_valid()?;
    let path = store.write_template(stack_name, &synthesis.template)?;
    tracing::info!(path = %path.display(), "template written");
    Ok(path)
}

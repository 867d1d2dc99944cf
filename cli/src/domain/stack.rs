//! The declaration pass: one linear walk that constructs every component and
//! wires it to the handles of its dependencies.

use anyhow::{Context, Result};
use threetier_common::Expr;

use crate::domain::config::StackConfig;
use crate::domain::resources::beanstalk::{ApplicationSpec, EnvironmentSpec, required_settings};
use crate::domain::resources::database::DatabaseSpec;
use crate::domain::resources::iam::{GET_SECRET_VALUE, InstanceProfileSpec, PolicyStatement, RoleSpec};
use crate::domain::resources::network::NetworkSpec;
use crate::domain::resources::secret::SecretSpec;
use crate::domain::tags::{TagSet, apply_tags, declare_resource_group};
use crate::domain::topology::Topology;

pub const OUTPUT_DATABASE_ENDPOINT: &str = "DatabaseEndpoint";
pub const OUTPUT_SECRET_ARN: &str = "SecretArn";
pub const OUTPUT_ENVIRONMENT_URL: &str = "EnvironmentUrl";

/// Declare the whole stack from validated inputs.
///
/// # Errors
///
/// Returns an error if the config is invalid or any component fails to
/// declare.
pub fn declare(config: &StackConfig) -> Result<Topology> {
    config.validate()?;

    let tags = TagSet::application(&config.application);
    let mut topo = Topology::new(format!(
        "{} three-tier stack ({})",
        config.stack_name, config.stage
    ));

    declare_resource_group(&mut topo, &config.application)?;

    let network = NetworkSpec::from(&config.network)
        .declare(&mut topo)
        .context("declaring network")?;

    let secret = SecretSpec::from(&config.secret)
        .declare(&mut topo)
        .context("declaring credential secret")?;

    let database = DatabaseSpec::from(&config.database)
        .declare(&mut topo, &network, &secret)
        .context("declaring database")?;

    let read_secret = PolicyStatement::allow(&[GET_SECRET_VALUE], vec![secret.locator.clone()])?;
    let role = RoleSpec::from_config(&config.role, vec![read_secret])
        .declare(&mut topo)
        .context("declaring access role")?;
    let profile = InstanceProfileSpec { role: &role }
        .declare(&mut topo)
        .context("declaring instance profile")?;

    let application = ApplicationSpec::from(&config.application).declare(&mut topo)?;
    let mut environment = EnvironmentSpec::from_config(
        &config.environment,
        &application,
        tags.tags().to_vec(),
        required_settings(&profile, &database, &secret),
    );
    environment.depends_on.extend(role.policy_id.iter().cloned());
    let url = environment
        .declare(&mut topo)
        .context("declaring environment")?;

    let endpoint = Expr::join(
        ":",
        vec![database.endpoint_address.clone(), database.endpoint_port.clone()],
    );
    topo.output(
        OUTPUT_DATABASE_ENDPOINT,
        &endpoint,
        "Database endpoint (host:port)",
    );
    topo.output(
        OUTPUT_SECRET_ARN,
        &secret.locator,
        "Locator of the database credential secret",
    );
    topo.output(OUTPUT_ENVIRONMENT_URL, &url, "Environment endpoint URL");

    apply_tags(&mut topo, &tags)?;
    Ok(topo)
}

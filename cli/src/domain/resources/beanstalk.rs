//! Hosting tier: the application container and its single runtime
//! environment.
//!
//! Option settings are the only channel carrying configuration into the
//! environment.

use serde_json::{Value, json};
use threetier_common::{
    Expr, OptionSetting, ResourceDecl, Tag, env_vars, namespaces, resource_types as rt,
};

use crate::domain::config::{ApplicationConfig, EnvironmentConfig};
use crate::domain::error::DeclarationError;
use crate::domain::resources::database::DatabaseHandle;
use crate::domain::resources::iam::InstanceProfileHandle;
use crate::domain::resources::secret::SecretHandle;
use crate::domain::topology::Topology;

pub const APPLICATION_ID: &str = "ThreeTierApp";
pub const ENVIRONMENT_ID: &str = "ThreeTierAppEnvironment";

/// Ordered option settings with map semantics keyed by
/// `(namespace, option_name)`: a later entry overrides an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSettings {
    entries: Vec<OptionSetting>,
}

impl OptionSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, namespace: &str, option_name: &str, value: impl Into<Value>) {
        self.entries
            .push(OptionSetting::new(namespace, option_name, value.into()));
    }

    pub fn extend(&mut self, other: OptionSettings) {
        self.entries.extend(other.entries);
    }

    /// Effective value for a key.
    #[must_use]
    pub fn get(&self, namespace: &str, option_name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|s| s.key() == (namespace, option_name))
            .map(|s| &s.value)
    }

    /// One entry per key, in order of each key's first appearance, carrying
    /// the last value written for it.
    #[must_use]
    pub fn resolved(&self) -> Vec<OptionSetting> {
        let mut out: Vec<OptionSetting> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if let Some(existing) = out.iter_mut().find(|s| s.key() == entry.key()) {
                existing.value.clone_from(&entry.value);
            } else {
                out.push(entry.clone());
            }
        }
        out
    }

    /// Raw entries, duplicates included.
    #[must_use]
    pub fn entries(&self) -> &[OptionSetting] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Settings the environment cannot run without: instance profile plus the
/// three database connection variables.
#[must_use]
pub fn required_settings(
    profile: &InstanceProfileHandle,
    database: &DatabaseHandle,
    secret: &SecretHandle,
) -> OptionSettings {
    let mut settings = OptionSettings::new();
    settings.push(
        namespaces::LAUNCH_CONFIGURATION,
        namespaces::IAM_INSTANCE_PROFILE,
        profile.arn.clone(),
    );
    settings.push(
        namespaces::APPLICATION_ENVIRONMENT,
        env_vars::DB_HOST,
        database.endpoint_address.clone(),
    );
    settings.push(
        namespaces::APPLICATION_ENVIRONMENT,
        env_vars::DB_PORT,
        database.endpoint_port.clone(),
    );
    settings.push(
        namespaces::APPLICATION_ENVIRONMENT,
        env_vars::DB_CREDS_SECRET,
        secret.locator.clone(),
    );
    settings
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSpec {
    pub name: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ApplicationHandle {
    pub logical_id: String,
    pub application: Expr,
}

impl From<&ApplicationConfig> for ApplicationSpec {
    fn from(cfg: &ApplicationConfig) -> Self {
        Self {
            name: cfg.application_name.clone(),
            description: format!("{} hosting application", cfg.tag_value),
        }
    }
}

impl ApplicationSpec {
    /// # Errors
    ///
    /// Returns an error if the logical id collides.
    pub fn declare(&self, topo: &mut Topology) -> Result<ApplicationHandle, DeclarationError> {
        let mut decl =
            ResourceDecl::new(rt::EB_APPLICATION).with_property("Description", self.description.as_str());
        if let Some(name) = &self.name {
            decl = decl.with_property("ApplicationName", name.as_str());
        }
        let application = topo.declare(APPLICATION_ID, decl)?;
        Ok(ApplicationHandle {
            logical_id: APPLICATION_ID.to_string(),
            application,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentSpec<'a> {
    pub application: &'a ApplicationHandle,
    pub solution_stack: String,
    pub tier_name: String,
    pub tier_type: String,
    pub tags: Vec<Tag>,
    pub settings: OptionSettings,
    /// Resources that must exist before instances boot but are not
    /// referenced from any property (the role's inline policy).
    pub depends_on: Vec<String>,
}

impl<'a> EnvironmentSpec<'a> {
    /// Build the environment from config, with `required` settings first and
    /// user-supplied extras appended after them.
    #[must_use]
    pub fn from_config(
        cfg: &EnvironmentConfig,
        application: &'a ApplicationHandle,
        tags: Vec<Tag>,
        required: OptionSettings,
    ) -> Self {
        let mut settings = required;
        for extra in &cfg.extra_settings {
            settings.push(&extra.namespace, &extra.option_name, extra.value.as_str());
        }
        Self {
            application,
            solution_stack: cfg.solution_stack.clone(),
            tier_name: cfg.tier_name.clone(),
            tier_type: cfg.tier_type.clone(),
            tags,
            settings,
            depends_on: Vec::new(),
        }
    }

    /// Declare the environment and return its deferred endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the logical id collides.
    pub fn declare(&self, topo: &mut Topology) -> Result<Expr, DeclarationError> {
        let settings: Vec<Value> = self
            .settings
            .resolved()
            .iter()
            .map(|s| {
                json!({
                    "Namespace": s.namespace,
                    "OptionName": s.option_name,
                    "Value": s.value,
                })
            })
            .collect();
        let tags: Vec<Value> = self
            .tags
            .iter()
            .map(|t| json!({ "Key": t.key, "Value": t.value }))
            .collect();

        let mut decl = ResourceDecl::new(rt::EB_ENVIRONMENT)
            .with_property("ApplicationName", self.application.application.clone())
            .with_property("SolutionStackName", self.solution_stack.as_str())
            .with_property(
                "Tier",
                json!({ "Name": self.tier_name, "Type": self.tier_type }),
            )
            .with_property("OptionSettings", settings);
        if !tags.is_empty() {
            decl = decl.with_property("Tags", tags);
        }
        decl.depends_on.clone_from(&self.depends_on);
        topo.declare(ENVIRONMENT_ID, decl)?;
        Ok(Expr::get_att(ENVIRONMENT_ID, "EndpointURL"))
    }
}

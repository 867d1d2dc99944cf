//! Topology checks over a synthesized template.
//!
//! Pure functions only. A failed check means the stack may deploy
//! structurally yet leave the application unable to reach its database.

use serde::Serialize;
use serde_json::Value;
use threetier_common::{ResourceDecl, Template, env_vars, namespaces, references, resource_types as rt};

use crate::domain::config::{StackConfig, Stage};
use crate::domain::graph::DependencyGraph;
use crate::domain::tags::{has_tag, supports_tags};

/// Types the stack declares exactly once.
pub const SINGLETON_TYPES: &[&str] = &[
    rt::VPC,
    rt::SECRET,
    rt::DB_INSTANCE,
    rt::ROLE,
    rt::INSTANCE_PROFILE,
    rt::EB_APPLICATION,
    rt::EB_ENVIRONMENT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Pass,
            detail: detail.into(),
        }
    }

    fn warn(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Warn,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Fail,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub checks: Vec<Check>,
}

impl CheckReport {
    #[must_use]
    pub fn failures(&self) -> Vec<&Check> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .collect()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&Check> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Warn)
            .collect()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Run every check.
#[must_use]
pub fn run_checks(template: &Template, config: &StackConfig) -> CheckReport {
    let mut checks = Vec::new();
    checks.extend(check_cardinality(template));
    checks.push(check_references(template));
    checks.push(check_db_credentials(template));
    checks.push(check_secret_scope(template));
    checks.push(check_environment_variables(template));
    checks.push(check_instance_profile(template));
    checks.push(check_deletion_protection(template, config.stage));
    checks.push(check_no_embedded_secrets(template));
    checks.push(check_tags(
        template,
        &config.application.tag_key,
        &config.application.tag_value,
    ));
    CheckReport { checks }
}

// ── Individual checks ────────────────────────────────────────────────────────

#[must_use]
pub fn check_cardinality(template: &Template) -> Vec<Check> {
    SINGLETON_TYPES
        .iter()
        .map(|ty| {
            let n = template.count_of_type(ty);
            if n == 1 {
                Check::pass("cardinality", format!("{ty}: 1"))
            } else {
                Check::fail("cardinality", format!("{ty}: expected 1, found {n}"))
            }
        })
        .collect()
}

#[must_use]
pub fn check_references(template: &Template) -> Check {
    const NAME: &str = "references";
    let graph = DependencyGraph::from_template(template);
    let dangling = graph.dangling();
    if !dangling.is_empty() {
        let detail: Vec<String> = dangling.iter().map(ToString::to_string).collect();
        return Check::fail(NAME, detail.join("; "));
    }
    match graph.provisioning_order() {
        Ok(order) => Check::pass(NAME, format!("{} resources, acyclic", order.len())),
        Err(e) => Check::fail(NAME, e.to_string()),
    }
}

/// Master credentials must be dynamic references into the secret declared
/// in this template.
#[must_use]
pub fn check_db_credentials(template: &Template) -> Check {
    const NAME: &str = "db-credentials";
    let (Some((secret_id, _)), Some((db_id, db))) = (
        template.single_of_type(rt::SECRET),
        template.single_of_type(rt::DB_INSTANCE),
    ) else {
        return Check::fail(NAME, "stack must declare one secret and one database");
    };
    for field in ["MasterUsername", "MasterUserPassword"] {
        let Some(value) = db.property(field) else {
            return Check::fail(NAME, format!("{db_id}.{field} is not set"));
        };
        if !references(value).contains(secret_id) {
            return Check::fail(
                NAME,
                format!("{db_id}.{field} does not resolve from secret {secret_id}"),
            );
        }
    }
    Check::pass(NAME, format!("{db_id} authenticates with {secret_id}"))
}

/// The secret-read statement must target exactly the secret's locator.
#[must_use]
pub fn check_secret_scope(template: &Template) -> Check {
    const NAME: &str = "secret-access-scope";
    let Some((secret_id, _)) = template.single_of_type(rt::SECRET) else {
        return Check::fail(NAME, "stack must declare one secret");
    };
    let locator = serde_json::json!({ "Ref": secret_id });

    let mut found = false;
    for (policy_id, policy) in template.resources_of_type(rt::POLICY) {
        let statements = policy
            .property("PolicyDocument.Statement")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for stmt in statements {
            if !grants_secret_read(&stmt) {
                continue;
            }
            found = true;
            let scope = match stmt.get("Resource") {
                Some(Value::Array(items)) => items.clone(),
                Some(single) => vec![single.clone()],
                None => Vec::new(),
            };
            if scope.is_empty() {
                return Check::fail(NAME, format!("{policy_id} grants secret read on no resource"));
            }
            if scope.iter().any(is_wildcard) {
                return Check::fail(NAME, format!("{policy_id} grants secret read on a wildcard"));
            }
            if scope != [locator.clone()] {
                return Check::fail(
                    NAME,
                    format!("{policy_id} secret read scope is not exactly {secret_id}"),
                );
            }
        }
    }
    if found {
        Check::pass(NAME, format!("scoped to {secret_id}"))
    } else {
        Check::fail(NAME, "no policy grants secretsmanager:GetSecretValue on the secret")
    }
}

fn grants_secret_read(stmt: &Value) -> bool {
    let allows = stmt.get("Effect").and_then(Value::as_str) == Some("Allow");
    let matches = |a: &Value| {
        a.as_str()
            .is_some_and(|s| s == "secretsmanager:GetSecretValue" || s == "secretsmanager:*" || s == "*")
    };
    allows
        && match stmt.get("Action") {
            Some(Value::Array(items)) => items.iter().any(matches),
            Some(single) => matches(single),
            None => false,
        }
}

fn is_wildcard(v: &Value) -> bool {
    v.as_str().is_some_and(|s| s.contains('*'))
}

fn environment_setting<'a>(env: &'a ResourceDecl, namespace: &str, name: &str) -> Option<&'a Value> {
    env.property("OptionSettings")
        .and_then(Value::as_array)?
        .iter()
        .rev()
        .find(|s| {
            s.get("Namespace").and_then(Value::as_str) == Some(namespace)
                && s.get("OptionName").and_then(Value::as_str) == Some(name)
        })
        .and_then(|s| s.get("Value"))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[must_use]
pub fn check_environment_variables(template: &Template) -> Check {
    const NAME: &str = "environment-variables";
    let Some((env_id, env)) = template.single_of_type(rt::EB_ENVIRONMENT) else {
        return Check::fail(NAME, "stack must declare one environment");
    };
    let mut missing = Vec::new();
    for var in env_vars::REQUIRED {
        match environment_setting(env, namespaces::APPLICATION_ENVIRONMENT, var) {
            Some(v) if !is_blank(v) => {}
            _ => missing.push(*var),
        }
    }
    if !missing.is_empty() {
        return Check::fail(NAME, format!("{env_id} is missing {}", missing.join(", ")));
    }

    if let Some((secret_id, _)) = template.single_of_type(rt::SECRET) {
        let creds = environment_setting(env, namespaces::APPLICATION_ENVIRONMENT, env_vars::DB_CREDS_SECRET);
        if !creds.is_some_and(|v| references(v).contains(secret_id)) {
            return Check::fail(NAME, format!("DB_CREDS_SECRET does not point at {secret_id}"));
        }
    }
    if let Some((db_id, _)) = template.single_of_type(rt::DB_INSTANCE) {
        for var in [env_vars::DB_HOST, env_vars::DB_PORT] {
            let v = environment_setting(env, namespaces::APPLICATION_ENVIRONMENT, var);
            if !v.is_some_and(|v| references(v).contains(db_id)) {
                return Check::warn(NAME, format!("{var} is not derived from {db_id}"));
            }
        }
    }
    Check::pass(NAME, env_vars::REQUIRED.join(", "))
}

#[must_use]
pub fn check_instance_profile(template: &Template) -> Check {
    const NAME: &str = "instance-profile";
    let (Some((profile_id, _)), Some((_, env))) = (
        template.single_of_type(rt::INSTANCE_PROFILE),
        template.single_of_type(rt::EB_ENVIRONMENT),
    ) else {
        return Check::fail(NAME, "stack must declare one instance profile and one environment");
    };
    match environment_setting(env, namespaces::LAUNCH_CONFIGURATION, namespaces::IAM_INSTANCE_PROFILE) {
        Some(v) if references(v).contains(profile_id) => {
            Check::pass(NAME, format!("{profile_id} attached"))
        }
        Some(_) => Check::fail(NAME, format!("IamInstanceProfile does not reference {profile_id}")),
        None => Check::fail(NAME, "environment has no IamInstanceProfile setting"),
    }
}

#[must_use]
pub fn check_deletion_protection(template: &Template, stage: Stage) -> Check {
    const NAME: &str = "deletion-protection";
    let Some((db_id, db)) = template.single_of_type(rt::DB_INSTANCE) else {
        return Check::fail(NAME, "stack must declare one database");
    };
    let protected = db.property("DeletionProtection").and_then(Value::as_bool) == Some(true);
    match (stage, protected) {
        (_, true) => Check::pass(NAME, format!("{db_id} is protected")),
        (Stage::Production, false) => Check::fail(
            NAME,
            format!("{db_id} has deletion protection disabled in production"),
        ),
        (Stage::Development, false) => Check::warn(
            NAME,
            format!("{db_id} has deletion protection disabled (enable before production)"),
        ),
    }
}

/// Credential values must only ever be dynamic references or engine
/// generated; a literal anywhere is a leak.
#[must_use]
pub fn check_no_embedded_secrets(template: &Template) -> Check {
    const NAME: &str = "no-embedded-secrets";
    for (id, decl) in &template.resources {
        if decl.resource_type == rt::SECRET && decl.properties.contains_key("SecretString") {
            return Check::fail(NAME, format!("{id} embeds a SecretString"));
        }
        if let Some(Value::String(s)) = decl.property("MasterUserPassword") {
            if !s.starts_with("{{resolve:") {
                return Check::fail(NAME, format!("{id}.MasterUserPassword is a literal"));
            }
        }
    }
    Check::pass(NAME, "credentials are referenced, never embedded")
}

#[must_use]
pub fn check_tags(template: &Template, key: &str, value: &str) -> Check {
    const NAME: &str = "tags";
    let untagged: Vec<&str> = template
        .resources
        .iter()
        .filter(|(_, d)| supports_tags(&d.resource_type) && d.resource_type != rt::RESOURCE_GROUP)
        .filter(|(_, d)| !has_tag(d, key, value))
        .map(|(id, _)| id.as_str())
        .collect();
    if untagged.is_empty() {
        Check::pass(NAME, format!("{key}={value} on every taggable resource"))
    } else {
        Check::warn(NAME, format!("missing {key}={value}: {}", untagged.join(", ")))
    }
}
